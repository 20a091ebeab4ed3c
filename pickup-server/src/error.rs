//! Unified service-layer error type for pickup-server
//!
//! `ServiceError` bridges integration errors (`StoreError`, `StripeError`,
//! `ZapierError`) and the API-layer error (`AppError`), so handlers can use
//! `?` on client calls directly.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::availability::CheckError;
use crate::store::StoreError;
use crate::stripe::StripeError;
use crate::zapier::ZapierError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Upstream`: an external service failed (logged, details hidden from the client)
/// - `App`: business-rule error, passed through to the client
#[derive(Debug)]
pub enum ServiceError {
    Upstream(ErrorCode, BoxError),
    App(AppError),
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Upstream(ErrorCode::BookingStoreError, e.into())
    }
}

impl From<CheckError> for ServiceError {
    fn from(e: CheckError) -> Self {
        match e {
            CheckError::Store(store) => store.into(),
            CheckError::UnknownSlot(pickup_time) => AppError::unknown_slot(pickup_time).into(),
        }
    }
}

impl From<StripeError> for ServiceError {
    fn from(e: StripeError) -> Self {
        match e {
            StripeError::NotFound(id) => AppError::new(ErrorCode::CheckoutSessionNotFound)
                .with_detail("id", id)
                .into(),
            StripeError::InvalidAmount { item, .. } => AppError::new(ErrorCode::InvalidPrice)
                .with_detail("item", item)
                .into(),
            other => ServiceError::Upstream(ErrorCode::PaymentSetupFailed, other.into()),
        }
    }
}

impl From<ZapierError> for ServiceError {
    fn from(e: ZapierError) -> Self {
        ServiceError::Upstream(ErrorCode::AutomationForwardFailed, e.into())
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Upstream(code, source) => {
                tracing::error!(code = %code, error = %source, "Upstream service error");
                AppError::new(code)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

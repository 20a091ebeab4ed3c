//! Error types and API response structures

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// This is the primary error type returned by HTTP handlers:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details (field errors, slot totals, ...)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create an invalid request error (malformed body, bad JSON)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }

    /// Create an unknown pickup slot error
    pub fn unknown_slot(pickup_time: impl Into<String>) -> Self {
        let t = pickup_time.into();
        Self::with_message(
            ErrorCode::UnknownPickupSlot,
            format!("Unknown pickup time: {}", t),
        )
        .with_detail("pickupTime", t)
    }

    /// Create a not configured error for an optional integration
    pub fn not_configured(integration: impl Into<String>) -> Self {
        let i = integration.into();
        Self::with_message(
            ErrorCode::IntegrationNotConfigured,
            format!("{} is not configured", i),
        )
        .with_detail("integration", i)
    }
}

/// Error response body
///
/// - `code`: Error code the storefront branches on
/// - `message`: Human-readable message
/// - `details`: Additional error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl ApiResponse {
    /// Create an error response from an AppError
    pub fn error(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::error(&self);

        if self.code.category().is_server_fault() {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "Server-side error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::SlotFull);
        assert_eq!(err.code, ErrorCode::SlotFull);
        assert_eq!(err.message, "Pickup slot is fully booked");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::new(ErrorCode::ValidationFailed)
            .with_detail("field", "pickupTime")
            .with_detail("reason", "required");

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "pickupTime");
        assert_eq!(details.get("reason").unwrap(), "required");
    }

    #[test]
    fn test_app_error_http_status() {
        assert_eq!(
            AppError::new(ErrorCode::SlotFull).http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::new(ErrorCode::BookingStoreError).http_status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_convenience_constructors() {
        let err = AppError::invalid_request("expected value at line 1 column 1");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert_eq!(err.message, "expected value at line 1 column 1");
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);

        let err = AppError::unknown_slot("14.00");
        assert_eq!(err.code, ErrorCode::UnknownPickupSlot);
        assert_eq!(err.details.unwrap().get("pickupTime").unwrap(), "14.00");

        let err = AppError::not_configured("Zapier");
        assert_eq!(err.code, ErrorCode::IntegrationNotConfigured);
        assert_eq!(err.message, "Zapier is not configured");
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::SlotFull, "9.30 is full");
        assert_eq!(format!("{}", err), "9.30 is full");
    }

    #[test]
    fn test_api_response_error() {
        let err = AppError::with_message(ErrorCode::SlotFull, "Slot full")
            .with_detail("maxAllowed", 20);
        let response = ApiResponse::error(&err);

        assert_eq!(response.code, 1002);
        assert_eq!(response.message, "Slot full");
        assert!(response.details.is_some());
    }

    #[test]
    fn test_api_response_serialize() {
        let response = ApiResponse::error(&AppError::new(ErrorCode::OrderEmpty));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"code\":4001"));
        assert!(json.contains("\"message\":\"Order is empty\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_api_response_deserialize() {
        let json = r#"{"code":6001,"message":"Booking store request failed"}"#;
        let response: ApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, 6001);
        assert!(response.details.is_none());
    }
}

//! Checkout sessions
//!
//! - POST /create-checkout-session: validate the cart, admit it against the
//!   slot's capacity, then open a Stripe Checkout Session
//! - GET /checkout-session/{id}: session summary for the success page

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::checkout::{CODE_INVALID_PRICE, CODE_INVALID_QUANTITY, CODE_ORDER_EMPTY};
use shared::models::{CheckoutRequest, CheckoutSessionCreated, CheckoutSessionSummary};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::json_rejection;
use crate::availability::{Admission, AdmissionMode};
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::store::SlotKey;
use crate::stripe::NewCheckoutSession;
use crate::util::generate_order_number;

pub async fn create_checkout_session(
    State(state): State<AppState>,
    request: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ServiceResult<Json<CheckoutSessionCreated>> {
    let Json(request) = request.map_err(json_rejection)?;
    request.validate().map_err(validation_error)?;

    let order_number = request
        .order_number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .unwrap_or_else(generate_order_number);
    let slot = SlotKey::new(&request.pickup_date, &request.pickup_time);
    let quantity = request.total_quantity();

    let reserved = admit(&state, &slot, &order_number, quantity).await?;

    let session = NewCheckoutSession {
        order_number: order_number.clone(),
        pickup_date: request.pickup_date,
        pickup_time: request.pickup_time,
        items: request.items,
        customer_email: request.customer_email,
        currency: state.config.stripe.currency.clone(),
        success_url: state.config.stripe.success_url.clone(),
        cancel_url: state.config.stripe.cancel_url.clone(),
    };

    let created = match state.stripe.create_checkout_session(&session).await {
        Ok(created) => created,
        Err(e) => {
            if reserved {
                state.ledger.release(&slot, &order_number).await;
            }
            return Err(e.into());
        }
    };

    Ok(Json(CheckoutSessionCreated {
        url: created.url.unwrap_or_default(),
        id: created.id,
        order_number,
    }))
}

/// Admit an order into its slot. Returns whether a reservation was taken.
async fn admit(
    state: &AppState,
    slot: &SlotKey,
    order_number: &str,
    quantity: u64,
) -> ServiceResult<bool> {
    match state.config.admission_mode {
        // Same answer as /check-availability; the cart's own size is not counted
        AdmissionMode::Legacy => {
            let result = state
                .checker
                .check(&slot.pickup_date, &slot.pickup_time)
                .await?;
            if !result.available {
                return Err(slot_full(slot, result.total_booked, result.max_allowed, quantity).into());
            }
            Ok(false)
        }
        AdmissionMode::Reserve => {
            match state
                .ledger
                .admit(&state.checker, slot, order_number, quantity)
                .await?
            {
                Admission::Admitted { .. } => Ok(true),
                Admission::Full {
                    total_booked,
                    reserved,
                    max_allowed,
                } => Err(slot_full(
                    slot,
                    total_booked.saturating_add(reserved),
                    max_allowed,
                    quantity,
                )
                .with_detail("reserved", reserved)
                .into()),
            }
        }
    }
}

fn slot_full(slot: &SlotKey, taken: u64, max_allowed: u64, requested: u64) -> AppError {
    AppError::with_message(
        ErrorCode::SlotFull,
        format!(
            "Pickup slot {} on {} cannot take {} more items",
            slot.pickup_time, slot.pickup_date, requested
        ),
    )
    .with_detail("pickupDate", slot.pickup_date.clone())
    .with_detail("pickupTime", slot.pickup_time.clone())
    .with_detail("totalProductsBooked", taken)
    .with_detail("maxAllowed", max_allowed)
    .with_detail("requested", requested)
}

/// Map validator errors to the most specific order error code
fn validation_error(errors: ValidationErrors) -> AppError {
    let mut codes = Vec::new();
    collect_codes(&errors, &mut codes);

    let code = [
        (CODE_ORDER_EMPTY, ErrorCode::OrderEmpty),
        (CODE_INVALID_QUANTITY, ErrorCode::InvalidQuantity),
        (CODE_INVALID_PRICE, ErrorCode::InvalidPrice),
    ]
    .into_iter()
    .find(|(name, _)| codes.iter().any(|c| c == name))
    .map(|(_, code)| code)
    .unwrap_or(ErrorCode::ValidationFailed);

    AppError::new(code).with_detail("errors", errors.to_string())
}

fn collect_codes(errors: &ValidationErrors, codes: &mut Vec<String>) {
    for kind in errors.errors().values() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                codes.extend(field_errors.iter().map(|e| e.code.to_string()));
            }
            ValidationErrorsKind::Struct(nested) => collect_codes(nested, codes),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_codes(nested, codes);
                }
            }
        }
    }
}

pub async fn get_checkout_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ServiceResult<Json<CheckoutSessionSummary>> {
    let session = state.stripe.retrieve_checkout_session(&session_id).await?;
    Ok(Json(session.into()))
}

//! Stripe webhook handler
//!
//! POST /webhook handles Stripe events (raw body for signature verification).
//! A paid checkout session becomes a booking record; the order is then
//! forwarded to Zapier when a hook is configured.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};

use crate::error::ServiceResult;
use crate::state::AppState;
use crate::store::{NewBooking, SlotKey};
use crate::stripe::{
    self, CheckoutSession, META_ITEMS, META_ORDER_NUMBER, META_PICKUP_DATE, META_PICKUP_TIME,
    META_QUANTITY,
};

const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const EVENT_ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
const EVENT_CHECKOUT_EXPIRED: &str = "checkout.session.expired";

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: Value,
}

/// Handle incoming Stripe webhook events
///
/// Must receive raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    // 1. Signature
    let sig_header = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Stripe-Signature header");
            AppError::with_message(
                ErrorCode::WebhookSignatureInvalid,
                "Missing Stripe-Signature header",
            )
        })?;

    stripe::verify_webhook_signature(
        &body,
        sig_header,
        &state.config.stripe.webhook_secret,
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        AppError::with_message(ErrorCode::WebhookSignatureInvalid, e.to_string())
    })?;

    // 2. Parse
    let event: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(%e, "Failed to parse webhook JSON");
        AppError::with_message(ErrorCode::WebhookPayloadInvalid, e.to_string())
    })?;
    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Received Stripe webhook");

    // 3. Idempotency: claim the id first so a concurrent redelivery is skipped
    if !state.processed_events.first_seen(&event.id) {
        tracing::info!(event_id = %event.id, "Duplicate webhook event, skipping");
        return Ok(received());
    }

    // 4. Dispatch
    let result = match event.event_type.as_str() {
        EVENT_CHECKOUT_COMPLETED | EVENT_ASYNC_PAYMENT_SUCCEEDED => {
            handle_checkout_paid(&state, &event).await
        }
        EVENT_CHECKOUT_EXPIRED => handle_checkout_expired(&state, &event).await,
        other => {
            tracing::debug!(event_type = other, "Unhandled webhook event type");
            Ok(())
        }
    };

    if let Err(e) = result {
        // Let Stripe's retry be processed
        state.processed_events.forget(&event.id);
        return Err(e.into());
    }
    Ok(received())
}

fn received() -> Json<Value> {
    Json(json!({ "received": true }))
}

fn checkout_session(event: &StripeEvent) -> Result<CheckoutSession, AppError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        AppError::with_message(
            ErrorCode::WebhookPayloadInvalid,
            format!("Invalid checkout session in {}: {e}", event.id),
        )
    })
}

/// Order metadata written at session creation
fn booking_from_session(session: &CheckoutSession) -> Option<NewBooking> {
    let order_number = session.metadata(META_ORDER_NUMBER)?;
    let pickup_date = session.metadata(META_PICKUP_DATE)?;
    let pickup_time = session.metadata(META_PICKUP_TIME)?;

    Some(NewBooking {
        order_number: order_number.to_string(),
        pickup_date: pickup_date.to_string(),
        pickup_time: pickup_time.to_string(),
        quantity: session
            .metadata(META_QUANTITY)
            .and_then(|q| q.trim().parse().ok())
            .unwrap_or(0),
        items: session.metadata(META_ITEMS).unwrap_or_default().to_string(),
        customer_email: session.email().map(String::from),
        amount_total: session.amount_total,
        checkout_session_id: Some(session.id.clone()),
    })
}

/// checkout.session.completed / async_payment_succeeded → booking record
async fn handle_checkout_paid(state: &AppState, event: &StripeEvent) -> ServiceResult<()> {
    let session = checkout_session(event)?;

    match session.payment_status.as_deref() {
        Some("paid") | Some("no_payment_required") => {}
        status => {
            // Delayed payment methods complete first and pay later
            tracing::info!(
                session_id = %session.id,
                payment_status = ?status,
                "Checkout completed without payment yet, waiting"
            );
            return Ok(());
        }
    }

    let Some(booking) = booking_from_session(&session) else {
        tracing::warn!(session_id = %session.id, "Checkout session missing order metadata");
        return Ok(());
    };

    let record_id = state.checker.store().record_booking(&booking).await?;
    tracing::info!(
        record_id = %record_id,
        order_number = %booking.order_number,
        slot = %booking.slot(),
        quantity = booking.quantity,
        "Booking recorded"
    );

    state
        .ledger
        .release(&booking.slot(), &booking.order_number)
        .await;

    forward_to_zapier(state, &booking, &session).await;
    Ok(())
}

/// The booking is already stored, so a Zapier failure is only logged
async fn forward_to_zapier(state: &AppState, booking: &NewBooking, session: &CheckoutSession) {
    let Some(zapier) = &state.zapier else {
        return;
    };
    let payload = json!({
        "orderNumber": booking.order_number,
        "pickupDate": booking.pickup_date,
        "pickupTime": booking.pickup_time,
        "quantity": booking.quantity,
        "items": booking.items,
        "customerEmail": booking.customer_email,
        "amountTotal": booking.amount_total,
        "currency": session.currency,
        "checkoutSessionId": session.id,
    });
    if let Err(e) = zapier.forward(&payload).await {
        tracing::warn!(
            order_number = %booking.order_number,
            error = %e,
            "Failed to forward order to Zapier"
        );
    }
}

/// checkout.session.expired → free the reservation
async fn handle_checkout_expired(state: &AppState, event: &StripeEvent) -> ServiceResult<()> {
    let session = checkout_session(event)?;
    let (Some(order_number), Some(pickup_date), Some(pickup_time)) = (
        session.metadata(META_ORDER_NUMBER),
        session.metadata(META_PICKUP_DATE),
        session.metadata(META_PICKUP_TIME),
    ) else {
        return Ok(());
    };

    let slot = SlotKey::new(pickup_date, pickup_time);
    if state.ledger.release(&slot, order_number).await {
        tracing::info!(order_number, slot = %slot, "Released reservation for expired checkout");
    }
    Ok(())
}

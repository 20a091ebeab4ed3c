//! HTTP routes for pickup-server
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | /health | [`health::health_check`] |
//! | GET | /check-availability/{pickupTime}/{pickupDate} | [`availability::check_availability`] |
//! | POST | /create-checkout-session | [`checkout::create_checkout_session`] |
//! | GET | /checkout-session/{id} | [`checkout::get_checkout_session`] |
//! | POST | /webhook | [`webhook::handle_webhook`] |
//! | POST | /send-to-zapier | [`zapier::send_to_zapier`] |

pub mod availability;
pub mod checkout;
pub mod health;
pub mod webhook;
pub mod zapier;

use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Router, middleware};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use shared::error::AppError;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

/// HTTP access log middleware
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        target: "http_access",
        "{} {} {} {}ms",
        method,
        uri,
        response.status(),
        started.elapsed().as_millis()
    );

    response
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = allowed_origins else {
        return CorsLayer::permissive();
    };
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

/// Map a JSON body rejection onto the unified error body
pub(crate) fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::invalid_request(rejection.body_text())
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/check-availability/{pickup_time}/{pickup_date}",
            get(availability::check_availability),
        )
        .route(
            "/create-checkout-session",
            post(checkout::create_checkout_session),
        )
        .route("/checkout-session/{id}", get(checkout::get_checkout_session))
        // Stripe webhook (signature-verified, raw body)
        .route("/webhook", post(webhook::handle_webhook))
        .route("/send-to-zapier", post(zapier::send_to_zapier))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}

//! Stripe integration via REST API (no SDK dependency)
//!
//! - Checkout Sessions: create (form-encoded) and retrieve
//! - Webhook signature verification ([`verify_webhook_signature`])
//! - Processed event ids for webhook idempotency ([`ProcessedEvents`])

mod events;
mod signature;

pub use events::{PROCESSED_EVENT_RETENTION, ProcessedEvents};
pub use signature::{
    SIGNATURE_TOLERANCE_SECS, SignatureError, compute_signature, verify_webhook_signature,
};

use std::collections::HashMap;

use reqwest::{StatusCode, Url};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::Value;
use shared::models::{CartItem, CheckoutSessionSummary};
use thiserror::Error;

use crate::config::StripeConfig;

/// Stripe rejects metadata values longer than this
pub const METADATA_VALUE_MAX_CHARS: usize = 500;

/// Metadata keys written on every session and read back by the webhook
pub const META_ORDER_NUMBER: &str = "orderNumber";
pub const META_PICKUP_DATE: &str = "pickupDate";
pub const META_PICKUP_TIME: &str = "pickupTime";
pub const META_QUANTITY: &str = "quantity";
pub const META_ITEMS: &str = "items";

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Checkout session not found: {0}")]
    NotFound(String),

    #[error("Invalid Stripe response: {0}")]
    InvalidResponse(String),

    #[error("Invalid amount for {item}: {price}")]
    InvalidAmount { item: String, price: Decimal },

    #[error("Invalid Stripe URL: {0}")]
    InvalidUrl(String),
}

/// Checkout Session object (the subset this service reads)
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSession {
    /// Email entered on the checkout page, falling back to the prefilled one
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

impl From<CheckoutSession> for CheckoutSessionSummary {
    fn from(session: CheckoutSession) -> Self {
        CheckoutSessionSummary {
            customer_email: session.email().map(String::from),
            id: session.id,
            status: session.status,
            payment_status: session.payment_status,
            amount_total: session.amount_total,
            currency: session.currency,
            metadata: session.metadata,
        }
    }
}

/// Everything needed to open a payment-mode Checkout Session
#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub order_number: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub items: Vec<CartItem>,
    pub customer_email: Option<String>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl NewCheckoutSession {
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    pub fn items_summary(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("{}x {}", i.quantity, i.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Form fields for `POST /v1/checkout/sessions`
    pub fn form_params(&self) -> Result<Vec<(String, String)>, StripeError> {
        let mut params = vec![("mode".to_string(), "payment".to_string())];

        for (i, item) in self.items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            params.push((
                format!("{prefix}[price_data][currency]"),
                self.currency.clone(),
            ));
            params.push((
                format!("{prefix}[price_data][unit_amount]"),
                unit_amount(item)?.to_string(),
            ));
            params.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }

        params.push(("success_url".to_string(), self.success_url.clone()));
        params.push(("cancel_url".to_string(), self.cancel_url.clone()));
        if let Some(email) = &self.customer_email {
            params.push(("customer_email".to_string(), email.clone()));
        }

        let metadata = [
            (META_ORDER_NUMBER, self.order_number.clone()),
            (META_PICKUP_DATE, self.pickup_date.clone()),
            (META_PICKUP_TIME, self.pickup_time.clone()),
            (META_QUANTITY, self.total_quantity().to_string()),
            (META_ITEMS, truncate_chars(&self.items_summary(), METADATA_VALUE_MAX_CHARS)),
        ];
        for (key, value) in metadata {
            params.push((format!("metadata[{key}]"), value));
        }
        // Copied onto the PaymentIntent so the order shows up on the payment
        params.push((
            format!("payment_intent_data[metadata][{META_ORDER_NUMBER}]"),
            self.order_number.clone(),
        ));

        Ok(params)
    }
}

/// Unit price in minor units, rounded half away from zero
fn unit_amount(item: &CartItem) -> Result<i64, StripeError> {
    (item.price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|amount| *amount >= 0)
        .ok_or_else(|| StripeError::InvalidAmount {
            item: item.name.clone(),
            price: item.price,
        })
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Thin Stripe REST client sharing the server's `reqwest::Client`
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: Url,
}

impl StripeClient {
    pub fn new(http: reqwest::Client, config: &StripeConfig) -> Result<Self, StripeError> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| StripeError::InvalidUrl(format!("{}: {e}", config.api_base)))?;
        if api_base.cannot_be_a_base() {
            return Err(StripeError::InvalidUrl(config.api_base.clone()));
        }
        Ok(Self {
            http,
            secret_key: config.secret_key.clone(),
            api_base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Create a Checkout Session (payment mode)
    pub async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSession, StripeError> {
        let params = session.form_params()?;
        let response = self
            .http
            .post(self.endpoint(&["v1", "checkout", "sessions"]))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await?;

        let created: CheckoutSession = parse_response(response).await?;
        if created.url.is_none() {
            return Err(StripeError::InvalidResponse(format!(
                "session {} has no url",
                created.id
            )));
        }
        tracing::info!(
            session_id = %created.id,
            order_number = %session.order_number,
            "Stripe checkout session created"
        );
        Ok(created)
    }

    /// Retrieve a Checkout Session by id
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .http
            .get(self.endpoint(&["v1", "checkout", "sessions", session_id]))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StripeError::NotFound(session_id.to_string()));
        }
        parse_response(response).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StripeError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| StripeError::InvalidResponse(e.to_string()))?;

    if !status.is_success() {
        let message = body["error"]["message"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| body.to_string());
        return Err(StripeError::Api {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_value(body).map_err(|e| StripeError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(name: &str, price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            name: name.to_string(),
            price,
            quantity,
        }
    }

    fn session(items: Vec<CartItem>) -> NewCheckoutSession {
        NewCheckoutSession {
            order_number: "ORD-42".to_string(),
            pickup_date: "2024-05-01".to_string(),
            pickup_time: "9.30".to_string(),
            items,
            customer_email: Some("anna@example.com".to_string()),
            currency: "eur".to_string(),
            success_url: "https://shop.example/success.html?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://shop.example/cancel.html".to_string(),
        }
    }

    fn client_for(server: &MockServer) -> StripeClient {
        let config = StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: "whsec_test".to_string(),
            api_base: server.uri(),
            currency: "eur".to_string(),
            success_url: String::new(),
            cancel_url: String::new(),
        };
        StripeClient::new(reqwest::Client::new(), &config).unwrap()
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_params() {
        let params = session(vec![
            item("Focaccia", Decimal::new(35, 1), 2),
            item("Tiramisu", Decimal::new(4, 0), 1),
        ])
        .form_params()
        .unwrap();

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("350"));
        assert_eq!(
            param(&params, "line_items[0][price_data][product_data][name]"),
            Some("Focaccia")
        );
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(param(&params, "line_items[1][price_data][unit_amount]"), Some("400"));
        assert_eq!(param(&params, "customer_email"), Some("anna@example.com"));
        assert_eq!(param(&params, "metadata[orderNumber]"), Some("ORD-42"));
        assert_eq!(param(&params, "metadata[pickupDate]"), Some("2024-05-01"));
        assert_eq!(param(&params, "metadata[pickupTime]"), Some("9.30"));
        assert_eq!(param(&params, "metadata[quantity]"), Some("3"));
        assert_eq!(
            param(&params, "metadata[items]"),
            Some("2x Focaccia, 1x Tiramisu")
        );
    }

    #[test]
    fn test_unit_amount_rounds_half_away_from_zero() {
        assert_eq!(unit_amount(&item("a", Decimal::new(1005, 3), 1)).unwrap(), 101);
        assert_eq!(unit_amount(&item("b", Decimal::new(1004, 3), 1)).unwrap(), 100);
        assert_eq!(unit_amount(&item("c", Decimal::ZERO, 1)).unwrap(), 0);
        assert!(unit_amount(&item("d", Decimal::new(-1, 0), 1)).is_err());
    }

    #[test]
    fn test_items_metadata_truncated() {
        let long_name = "é".repeat(600);
        let params = session(vec![item(&long_name, Decimal::ONE, 1)])
            .form_params()
            .unwrap();
        let items = param(&params, "metadata[items]").unwrap();
        assert_eq!(items.chars().count(), METADATA_VALUE_MAX_CHARS);
        assert!(items.starts_with("1x éé"));
    }

    #[test]
    fn test_no_customer_email_param_when_absent() {
        let mut s = session(vec![item("Focaccia", Decimal::ONE, 1)]);
        s.customer_email = None;
        let params = s.form_params().unwrap();
        assert!(param(&params, "customer_email").is_none());
    }

    #[tokio::test]
    async fn test_create_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("authorization", "Basic c2tfdGVzdF8xMjM6"))
            .and(body_string_contains("mode=payment"))
            .and(body_string_contains("metadata%5BorderNumber%5D=ORD-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "object": "checkout.session",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1",
                "status": "open"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_checkout_session(&session(vec![item("Focaccia", Decimal::ONE, 1)]))
            .await
            .unwrap();
        assert_eq!(created.id, "cs_test_1");
        assert_eq!(
            created.url.as_deref(),
            Some("https://checkout.stripe.com/c/pay/cs_test_1")
        );
    }

    #[tokio::test]
    async fn test_create_checkout_session_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"type": "invalid_request_error", "message": "Invalid currency: xyz"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_checkout_session(&session(vec![item("Focaccia", Decimal::ONE, 1)]))
            .await
            .unwrap_err();
        match err {
            StripeError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid currency: xyz");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retrieve_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "status": "complete",
                "payment_status": "paid",
                "customer_details": {"email": "anna@example.com"},
                "amount_total": 1050,
                "currency": "eur",
                "metadata": {"orderNumber": "ORD-42", "pickupTime": "9.30"}
            })))
            .mount(&server)
            .await;

        let summary: CheckoutSessionSummary = client_for(&server)
            .retrieve_checkout_session("cs_test_1")
            .await
            .unwrap()
            .into();
        assert_eq!(summary.payment_status.as_deref(), Some("paid"));
        assert_eq!(summary.customer_email.as_deref(), Some("anna@example.com"));
        assert_eq!(summary.amount_total, Some(1050));
        assert_eq!(summary.metadata["orderNumber"], "ORD-42");
    }

    #[tokio::test]
    async fn test_retrieve_unknown_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"type": "invalid_request_error", "message": "No such checkout.session"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .retrieve_checkout_session("cs_missing")
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::NotFound(id) if id == "cs_missing"));
    }
}

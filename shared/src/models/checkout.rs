//! Checkout request/response models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::{Validate, ValidationError};

/// Validation codes surfaced through `ValidationErrors`
pub const CODE_ORDER_EMPTY: &str = "order_empty";
pub const CODE_INVALID_QUANTITY: &str = "invalid_quantity";
pub const CODE_INVALID_PRICE: &str = "invalid_price";

/// One line of the storefront cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[validate(length(min = 1))]
    pub name: String,
    /// Unit price in major currency units (e.g. euros)
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    #[validate(range(min = 1, code = "invalid_quantity"))]
    pub quantity: u32,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new(CODE_INVALID_PRICE));
    }
    Ok(())
}

/// Body of `POST /create-checkout-session`
///
/// Order number and pickup slot are copied into Stripe metadata, whose
/// values are capped at 500 characters.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, code = "order_empty"), nested)]
    pub items: Vec<CartItem>,
    /// Generated by the storefront; the server fills one in when absent
    #[serde(default)]
    #[validate(length(max = 500))]
    pub order_number: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub pickup_date: String,
    #[validate(length(min = 1, max = 500))]
    pub pickup_time: String,
    #[serde(default)]
    #[validate(email)]
    pub customer_email: Option<String>,
}

impl CheckoutRequest {
    /// Total number of units across all cart lines
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// Response of `POST /create-checkout-session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionCreated {
    pub id: String,
    /// Hosted checkout page the browser is redirected to
    pub url: String,
    pub order_number: String,
}

/// Response of `GET /checkout-session/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionSummary {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Minor currency units
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            name: name.to_string(),
            price,
            quantity,
        }
    }

    fn request(items: Vec<CartItem>) -> CheckoutRequest {
        CheckoutRequest {
            items,
            order_number: None,
            pickup_date: "2024-05-01".to_string(),
            pickup_time: "9.30".to_string(),
            customer_email: None,
        }
    }

    #[test]
    fn test_deserialize_storefront_body() {
        let json = r#"{
            "items": [{"name": "Focaccia", "price": 3.5, "quantity": 2}],
            "orderNumber": "ORD-1",
            "pickupDate": "2024-05-01",
            "pickupTime": "9.30"
        }"#;
        let req: CheckoutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.items[0].price, Decimal::new(35, 1));
        assert_eq!(req.order_number.as_deref(), Some("ORD-1"));
        assert!(req.customer_email.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_total_quantity() {
        let req = request(vec![
            item("Focaccia", Decimal::new(35, 1), 2),
            item("Tiramisu", Decimal::new(4, 0), 1),
        ]);
        assert_eq!(req.total_quantity(), 3);
    }

    #[test]
    fn test_metadata_fields_capped_at_500_chars() {
        let mut req = request(vec![item("Focaccia", Decimal::new(35, 1), 1)]);
        req.order_number = Some("O".repeat(500));
        req.pickup_date = "d".repeat(500);
        req.pickup_time = "t".repeat(500);
        assert!(req.validate().is_ok());

        let mut long_order = req.clone();
        long_order.order_number = Some("O".repeat(501));
        let errors = long_order.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("order_number"));

        let mut long_date = req.clone();
        long_date.pickup_date = "d".repeat(501);
        let errors = long_date.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("pickup_date"));

        let mut long_time = req;
        long_time.pickup_time = "t".repeat(501);
        let errors = long_time.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("pickup_time"));
    }

    #[test]
    fn test_empty_items_rejected() {
        let errors = request(vec![]).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
        assert_eq!(errors.field_errors()["items"][0].code, CODE_ORDER_EMPTY);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let req = request(vec![item("Focaccia", Decimal::new(35, 1), 0)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        let req = request(vec![item("Focaccia", Decimal::new(-1, 0), 1)]);
        assert!(req.validate().is_err());

        let free = request(vec![item("Water", Decimal::ZERO, 1)]);
        assert!(free.validate().is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut req = request(vec![item("Focaccia", Decimal::new(35, 1), 1)]);
        req.customer_email = Some("not-an-email".to_string());
        assert!(req.validate().is_err());
    }
}

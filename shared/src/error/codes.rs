//! Unified error codes for the pickup backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Pickup slot errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Integration errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the storefront can
/// branch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Pickup slot ====================
    /// Pickup time is not part of the capacity table
    UnknownPickupSlot = 1001,
    /// Pickup slot has no remaining capacity
    SlotFull = 1002,

    // ==================== 4xxx: Order ====================
    /// Order has no items
    OrderEmpty = 4001,
    /// Item quantity is invalid
    InvalidQuantity = 4002,
    /// Item price is invalid
    InvalidPrice = 4003,

    // ==================== 5xxx: Payment ====================
    /// Checkout session could not be created
    PaymentSetupFailed = 5001,
    /// Checkout session not found
    CheckoutSessionNotFound = 5002,
    /// Webhook signature missing or invalid
    WebhookSignatureInvalid = 5003,
    /// Webhook payload could not be parsed
    WebhookPayloadInvalid = 5004,

    // ==================== 6xxx: Integration ====================
    /// Booking store request failed
    BookingStoreError = 6001,
    /// Forwarding to the automation hook failed
    AutomationForwardFailed = 6002,
    /// Integration is not configured
    IntegrationNotConfigured = 6003,
}

impl ErrorCode {
    /// Get the numeric code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidRequest => "Invalid request",

            // Pickup slot
            ErrorCode::UnknownPickupSlot => "Unknown pickup time",
            ErrorCode::SlotFull => "Pickup slot is fully booked",

            // Order
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::InvalidQuantity => "Item quantity must be at least 1",
            ErrorCode::InvalidPrice => "Item price must not be negative",

            // Payment
            ErrorCode::PaymentSetupFailed => "Payment setup failed",
            ErrorCode::CheckoutSessionNotFound => "Checkout session not found",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature verification failed",
            ErrorCode::WebhookPayloadInvalid => "Webhook payload is invalid",

            // Integration
            ErrorCode::BookingStoreError => "Booking store request failed",
            ErrorCode::AutomationForwardFailed => "Forwarding to automation hook failed",
            ErrorCode::IntegrationNotConfigured => "Integration is not configured",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            5 => Ok(ErrorCode::InvalidRequest),

            // Pickup slot
            1001 => Ok(ErrorCode::UnknownPickupSlot),
            1002 => Ok(ErrorCode::SlotFull),

            // Order
            4001 => Ok(ErrorCode::OrderEmpty),
            4002 => Ok(ErrorCode::InvalidQuantity),
            4003 => Ok(ErrorCode::InvalidPrice),

            // Payment
            5001 => Ok(ErrorCode::PaymentSetupFailed),
            5002 => Ok(ErrorCode::CheckoutSessionNotFound),
            5003 => Ok(ErrorCode::WebhookSignatureInvalid),
            5004 => Ok(ErrorCode::WebhookPayloadInvalid),

            // Integration
            6001 => Ok(ErrorCode::BookingStoreError),
            6002 => Ok(ErrorCode::AutomationForwardFailed),
            6003 => Ok(ErrorCode::IntegrationNotConfigured),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

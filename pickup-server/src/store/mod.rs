//! Booking store
//!
//! The tabular store owns booking records; this service only filters them by
//! slot and appends new ones after payment.
//!
//! - [`AirtableStore`] - Airtable REST API
//! - [`InMemoryBookingStore`] - process-local store (development, tests)

mod airtable;
mod memory;

pub use airtable::AirtableStore;
pub use memory::InMemoryBookingStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Field names shared by the query filter and created records
pub const FIELD_PICKUP_DATE: &str = "pickupDate";
pub const FIELD_PICKUP_TIME: &str = "pickupTime";
pub const FIELD_QUANTITY: &str = "quantity";

/// A pickup slot on a given date; both parts are opaque string keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub pickup_date: String,
    pub pickup_time: String,
}

impl SlotKey {
    pub fn new(pickup_date: impl Into<String>, pickup_time: impl Into<String>) -> Self {
        Self {
            pickup_date: pickup_date.into(),
            pickup_time: pickup_time.into(),
        }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.pickup_date, self.pickup_time)
    }
}

/// A booking as read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRecord {
    pub id: String,
    pub pickup_date: String,
    pub pickup_time: String,
    /// Already normalized with [`lenient_quantity`]
    pub quantity: u64,
}

/// A paid order to append to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub order_number: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub quantity: u64,
    /// Cart summary, e.g. `2x Focaccia, 1x Tiramisu`
    pub items: String,
    pub customer_email: Option<String>,
    /// Minor currency units
    pub amount_total: Option<i64>,
    pub checkout_session_id: Option<String>,
}

impl NewBooking {
    pub fn slot(&self) -> SlotKey {
        SlotKey::new(&self.pickup_date, &self.pickup_time)
    }
}

/// Booking store error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an error status or error payload
    #[error("Booking store error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The store answered 2xx with a body we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
}

/// Read-side and write-side access to booking records
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// All records whose date and time exactly equal the slot's keys.
    ///
    /// An empty result is `Ok(vec![])`; failures never masquerade as empty.
    async fn find_bookings(&self, slot: &SlotKey) -> Result<Vec<BookingRecord>, StoreError>;

    /// Append a booking and return the store's record id
    async fn record_booking(&self, booking: &NewBooking) -> Result<String, StoreError>;
}

/// Interpret a stored `quantity` field.
///
/// Missing, negative or non-numeric values count as zero; fractional values
/// are truncated and numeric strings are parsed.
pub fn lenient_quantity(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
                .unwrap_or(0)
        }),
        Some(Value::String(s)) => lenient_quantity_str(s.trim()),
        _ => 0,
    }
}

fn lenient_quantity_str(s: &str) -> u64 {
    s.parse::<u64>().unwrap_or_else(|_| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.trunc() as u64)
            .unwrap_or(0)
    })
}

//! Slot availability response

use serde::{Deserialize, Serialize};

/// Response body of `GET /check-availability/{pickupTime}/{pickupDate}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub pickup_time: String,
    pub pickup_date: String,
    /// Sum of quantities already booked in the slot
    pub total_products_booked: u64,
    pub max_allowed: u64,
    /// `total_products_booked < max_allowed`
    pub available: bool,
}

//! Wire models shared with the storefront
//!
//! All JSON field names are camelCase to match the browser client.

pub mod availability;
pub mod checkout;

pub use availability::AvailabilityResponse;
pub use checkout::{CartItem, CheckoutRequest, CheckoutSessionCreated, CheckoutSessionSummary};

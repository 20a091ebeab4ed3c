//! pickup-server: order intake backend for a food-pickup storefront
//!
//! - Slot availability against a per-slot capacity table
//! - Stripe Checkout sessions and webhook handling
//! - Booking records in Airtable, forwarded to a Zapier hook

pub mod api;
pub mod availability;
pub mod config;
pub mod error;
pub mod logger;
pub mod state;
pub mod store;
pub mod stripe;
pub mod util;
pub mod zapier;

pub use config::Config;
pub use state::AppState;

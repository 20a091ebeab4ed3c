//! Shared utility functions for pickup-server

use rand::Rng;
use rand::distributions::Alphanumeric;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Order number for carts that arrive without one: `ORD-YYYYMMDD-XXXXXX`
pub fn generate_order_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{suffix}", chrono::Utc::now().format("%Y%m%d"))
}

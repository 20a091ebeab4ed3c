//! Shared types for the pickup ordering backend
//!
//! Error codes, the error response body and the JSON wire
//! types exchanged with the storefront.

pub mod error;
pub mod models;

pub use error::{ApiResponse, AppError, ErrorCategory, ErrorCode};

//! Unified error system for the pickup backend
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Error response body
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Pickup slot errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Integration errors (booking store, automation hook)
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! // Create a simple error
//! let err = AppError::new(ErrorCode::SlotFull);
//!
//! // Create an error with custom message
//! let err = AppError::with_message(ErrorCode::ValidationFailed, "items must not be empty");
//!
//! // Create an error with details
//! let err = AppError::new(ErrorCode::ValidationFailed)
//!     .with_detail("field", "pickupTime");
//!
//! // Convert to API response
//! let response = ApiResponse::error(&err);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError};

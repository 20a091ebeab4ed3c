//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 1xxx: Pickup slot errors
/// - 4xxx: Order errors
/// - 5xxx: Payment errors
/// - 6xxx: Integration errors
///
/// Unassigned ranges fall back to `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Pickup slot errors (1xxx)
    Slot,
    /// Order errors (4xxx)
    Order,
    /// Payment errors (5xxx)
    Payment,
    /// Integration errors (6xxx)
    Integration,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            1000..2000 => Self::Slot,
            4000..5000 => Self::Order,
            5000..6000 => Self::Payment,
            6000..7000 => Self::Integration,
            _ => Self::General,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Slot => "slot",
            Self::Order => "order",
            Self::Payment => "payment",
            Self::Integration => "integration",
        }
    }

    /// Whether errors in this category are server-side faults worth logging
    pub fn is_server_fault(&self) -> bool {
        matches!(self, Self::Integration)
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

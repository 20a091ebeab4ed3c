//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::CheckoutSessionNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::SlotFull => StatusCode::CONFLICT,

            // 502 Bad Gateway (an upstream integration failed)
            Self::PaymentSetupFailed
            | Self::BookingStoreError
            | Self::AutomationForwardFailed => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (integration switched off)
            Self::IntegrationNotConfigured => StatusCode::SERVICE_UNAVAILABLE,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(
            ErrorCode::CheckoutSessionNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_slot_full_is_conflict() {
        assert_eq!(ErrorCode::SlotFull.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_upstream_status() {
        assert_eq!(
            ErrorCode::BookingStoreError.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::PaymentSetupFailed.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::AutomationForwardFailed.http_status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_service_unavailable_status() {
        assert_eq!(
            ErrorCode::IntegrationNotConfigured.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvalidRequest.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::UnknownPickupSlot.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::OrderEmpty.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::WebhookSignatureInvalid.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}

//! Stripe webhook signature verification (HMAC-SHA256)
//!
//! Header format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...][,v0=...]`.
//! The signed payload is `"{t}.{raw body}"`. Several `v1` entries appear
//! while a signing secret is being rolled; any one matching is enough.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Events whose timestamp is further than this from now are rejected
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid Stripe-Signature header")]
    MalformedHeader,

    #[error("Invalid webhook timestamp")]
    InvalidTimestamp,

    #[error("Invalid webhook secret")]
    InvalidSecret,

    #[error("Webhook signature mismatch")]
    Mismatch,

    #[error("Webhook timestamp outside tolerance")]
    TimestampOutOfTolerance,
}

fn mac_for(payload: &[u8], timestamp: &str, secret: &str) -> Result<Hmac<Sha256>, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex `v1` signature Stripe would send for this payload
pub fn compute_signature(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, SignatureError> {
    let mac = mac_for(payload, &timestamp.to_string(), secret)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `Stripe-Signature` header against the raw body.
///
/// `now` is the current unix time in seconds. Returns the signed timestamp.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<i64, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in sig_header.split(',').map(str::trim) {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let mac = mac_for(payload, timestamp, secret)?;
    // verify_slice compares in constant time
    let matched = signatures
        .iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    Ok(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
    const NOW: i64 = 1_714_550_400;

    fn header_for(ts: i64, secret: &str) -> String {
        format!("t={ts},v1={}", compute_signature(PAYLOAD, ts, secret).unwrap())
    }

    #[test]
    fn test_valid_signature() {
        let header = header_for(NOW, SECRET);
        assert_eq!(verify_webhook_signature(PAYLOAD, &header, SECRET, NOW), Ok(NOW));
    }

    #[test]
    fn test_any_v1_may_match() {
        let good = compute_signature(PAYLOAD, NOW, SECRET).unwrap();
        let stale = compute_signature(PAYLOAD, NOW, "whsec_old").unwrap();
        let header = format!("t={NOW}, v1={stale}, v1={good}, v0=deadbeef");
        assert!(verify_webhook_signature(PAYLOAD, &header, SECRET, NOW).is_ok());
    }

    #[test]
    fn test_wrong_secret() {
        let header = header_for(NOW, "whsec_other");
        assert_eq!(
            verify_webhook_signature(PAYLOAD, &header, SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_tampered_payload() {
        let header = header_for(NOW, SECRET);
        let tampered = br#"{"id":"evt_2","type":"checkout.session.completed"}"#;
        assert_eq!(
            verify_webhook_signature(tampered, &header, SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_timestamp_tolerance() {
        let header = header_for(NOW - SIGNATURE_TOLERANCE_SECS, SECRET);
        assert!(verify_webhook_signature(PAYLOAD, &header, SECRET, NOW).is_ok());

        let header = header_for(NOW - SIGNATURE_TOLERANCE_SECS - 1, SECRET);
        assert_eq!(
            verify_webhook_signature(PAYLOAD, &header, SECRET, NOW),
            Err(SignatureError::TimestampOutOfTolerance)
        );

        let header = header_for(NOW + SIGNATURE_TOLERANCE_SECS + 1, SECRET);
        assert_eq!(
            verify_webhook_signature(PAYLOAD, &header, SECRET, NOW),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        for ts in [i64::MIN, i64::MAX, 0] {
            let header = header_for(ts, SECRET);
            assert_eq!(
                verify_webhook_signature(PAYLOAD, &header, SECRET, NOW),
                Err(SignatureError::TimestampOutOfTolerance),
                "t={ts}"
            );
        }
    }

    #[test]
    fn test_malformed_headers() {
        let only_timestamp = format!("t={NOW}");
        for header in ["", "v1=abcd", only_timestamp.as_str(), "garbage"] {
            assert_eq!(
                verify_webhook_signature(PAYLOAD, header, SECRET, NOW),
                Err(SignatureError::MalformedHeader),
                "header: {header:?}"
            );
        }
        assert_eq!(
            verify_webhook_signature(PAYLOAD, &format!("t={NOW},v1=not-hex"), SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
    }
}

//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header looks like `t=1492774577,v1=5257a8...,v0=...`.
//! The expected `v1` value is the hex HMAC-SHA256 of `"{t}.{raw body}"` keyed
//! with the endpoint's signing secret. Any matching `v1` entry is accepted.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::PaymentError;

/// Maximum age of a signed timestamp, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verify a webhook payload against its `Stripe-Signature` header.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the header is malformed, the
/// timestamp is outside `tolerance_secs` of `now`, or no signature matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), PaymentError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| PaymentError::InvalidSignature("Missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature(
            "No v1 signature".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| PaymentError::InvalidSignature("Invalid timestamp".to_string()))?;
    if now.abs_diff(ts) > tolerance_secs.unsigned_abs() {
        return Err(PaymentError::InvalidSignature(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_signature(timestamp, payload, secret)?;
    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        return Ok(());
    }

    Err(PaymentError::InvalidSignature(
        "Signature mismatch".to_string(),
    ))
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the key is rejected.
pub fn compute_signature(
    timestamp: &str,
    payload: &[u8],
    secret: &str,
) -> Result<String, PaymentError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_signing";
    const NOW: i64 = 1_760_000_000;
    const BODY: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;

    fn header_for(ts: i64, body: &[u8]) -> String {
        let sig = compute_signature(&ts.to_string(), body, SECRET).unwrap();
        format!("t={ts},v1={sig}")
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }

    #[test]
    fn test_valid_signature() {
        let header = header_for(NOW, BODY);
        assert!(verify_signature(BODY, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let sig = compute_signature(&NOW.to_string(), BODY, SECRET).unwrap();
        let header = format!("t={NOW}, v1=deadbeef, v0=ignored, v1={sig}");
        assert!(verify_signature(BODY, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_tampered_body() {
        let header = header_for(NOW, BODY);
        let result = verify_signature(b"{}", &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS);
        assert!(matches!(result, Err(PaymentError::InvalidSignature(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let header = header_for(NOW, BODY);
        let result = verify_signature(BODY, &header, "whsec_other", NOW, DEFAULT_TOLERANCE_SECS);
        assert!(result.is_err());
    }

    #[test]
    fn test_stale_timestamp() {
        let header = header_for(NOW - 301, BODY);
        let result = verify_signature(BODY, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS);
        assert!(
            matches!(result, Err(PaymentError::InvalidSignature(ref m)) if m.contains("tolerance"))
        );
    }

    #[test]
    fn test_extreme_timestamps_are_rejected() {
        for ts in [i64::MIN, i64::MAX] {
            let header = format!("t={ts},v1=00");
            let result = verify_signature(BODY, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS);
            assert!(
                matches!(result, Err(PaymentError::InvalidSignature(ref m)) if m.contains("tolerance")),
                "{ts}"
            );
        }
    }

    #[test]
    fn test_malformed_headers() {
        let timestamp_only = format!("t={NOW}");
        for header in ["", "v1=abc", "t=abc,v1=abc", timestamp_only.as_str()] {
            let result = verify_signature(BODY, header, SECRET, NOW, DEFAULT_TOLERANCE_SECS);
            assert!(result.is_err(), "{header:?}");
        }
    }
}

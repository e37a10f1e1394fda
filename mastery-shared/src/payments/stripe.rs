/// Stripe webhook events and signatures
///
/// # Signature scheme
///
/// Stripe sends `Stripe-Signature: t=<unix seconds>,v1=<hex hmac>[,v1=...]`.
/// The HMAC-SHA256 is computed with the endpoint's signing secret over
/// `"{t}.{raw body}"`. Several `v1` entries appear while a secret is being
/// rolled; any one of them matching is enough.
///
/// # Example
///
/// ```
/// use mastery_shared::payments::stripe::{sign_payload, verify_signature, DEFAULT_TOLERANCE_SECS};
///
/// let body = br#"{"type":"ping"}"#;
/// let header = sign_payload(body, "whsec_test", chrono::Utc::now().timestamp());
///
/// assert!(verify_signature(body, &header, "whsec_test", DEFAULT_TOLERANCE_SECS).is_ok());
/// assert!(verify_signature(body, &header, "whsec_other", DEFAULT_TOLERANCE_SECS).is_err());
/// ```

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::models::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Event type that grants access
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Oldest accepted signature timestamp, in seconds (Stripe's recommendation)
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Accepted clock skew for timestamps from the future
const FUTURE_SKEW_SECS: i64 = 60;

/// Signature verification failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature header is malformed")]
    MalformedHeader,

    #[error("Signature timestamp is not a number")]
    InvalidTimestamp,

    #[error("Signature timestamp is outside the tolerance window (age {age}s)")]
    Stale { age: i64 },

    #[error("No signature matches the payload")]
    Mismatch,

    #[error("Webhook secret is empty")]
    EmptySecret,
}

/// Verifies a `Stripe-Signature` header against the current clock.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    verify_signature_at(
        payload,
        header,
        secret,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
}

/// Verifies a `Stripe-Signature` header as of `now` (unix seconds).
pub fn verify_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::EmptySecret);
    }

    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(sig) = part.strip_prefix("v1=") {
            candidates.push(sig);
        }
    }

    let timestamp_str = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    let age = now - timestamp;
    if age > tolerance_secs || age < -FUTURE_SKEW_SECS {
        tracing::warn!(age, tolerance_secs, "Stripe signature timestamp rejected");
        return Err(SignatureError::Stale { age });
    }

    let expected = compute_signature(payload, secret, timestamp_str);

    // Undecodable candidates are skipped; the comparison itself is constant-time.
    let matched = candidates
        .iter()
        .filter_map(|candidate| hex::decode(candidate).ok())
        .any(|provided| {
            provided.len() == expected.len() && bool::from(provided.ct_eq(&expected))
        });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Builds a `Stripe-Signature` header value for `payload`.
///
/// Used by tests and local tooling that replay events against the receiver.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let timestamp = timestamp.to_string();
    let signature = compute_signature(payload, secret, &timestamp);
    format!("t={},v1={}", timestamp, hex::encode(signature))
}

fn compute_signature(payload: &[u8], secret: &str, timestamp: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Event envelope; `data.object` is decoded per event type
///
/// Only `type` is required. Events this system ignores may arrive without
/// a payload.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub data: Option<StripeEventData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    #[serde(default)]
    pub object: serde_json::Value,
}

/// Event types this system distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CheckoutSessionCompleted,
    Other(String),
}

impl StripeEvent {
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => EventKind::CheckoutSessionCompleted,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Decodes `data.object` as a checkout session.
    pub fn checkout_session(&self) -> Result<CheckoutSession, serde_json::Error> {
        match &self.data {
            Some(data) => CheckoutSession::deserialize(&data.object),
            None => Err(serde::de::Error::missing_field("data")),
        }
    }
}

/// Fields of a Checkout Session object this system reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub id: Option<String>,

    /// User id echoed back from the checkout link
    #[serde(default)]
    pub client_reference_id: Option<String>,

    #[serde(default)]
    pub customer_email: Option<String>,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub payment_intent: Option<String>,

    #[serde(default)]
    pub payment_status: Option<String>,

    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSession {
    /// User the payment is attributed to; blank ids count as missing.
    pub fn user_id(&self) -> Option<UserId> {
        self.client_reference_id.as_deref().and_then(UserId::parse)
    }

    /// Email typed at checkout, falling back to the one collected in `customer_details`.
    pub fn email(&self) -> Option<&str> {
        self.customer_email.as_deref().or_else(|| {
            self.customer_details
                .as_ref()
                .and_then(|details| details.email.as_deref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_735_689_600;

    #[test]
    fn test_valid_signature_is_accepted() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let header = sign_payload(body, SECRET, NOW);

        assert_eq!(
            verify_signature_at(body, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Ok(())
        );
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let header = sign_payload(br#"{"amount":97}"#, SECRET, NOW);

        assert_eq!(
            verify_signature_at(br#"{"amount":1}"#, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let body = b"{}";
        let good = sign_payload(body, SECRET, NOW);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);

        assert!(verify_signature_at(body, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_ok());
    }

    #[test]
    fn test_stale_and_future_timestamps_are_rejected() {
        let body = b"{}";

        let old = sign_payload(body, SECRET, NOW - DEFAULT_TOLERANCE_SECS - 1);
        assert!(matches!(
            verify_signature_at(body, &old, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Stale { .. })
        ));

        let future = sign_payload(body, SECRET, NOW + 120);
        assert!(matches!(
            verify_signature_at(body, &future, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Stale { .. })
        ));
    }

    #[test]
    fn test_malformed_headers() {
        let body = b"{}";
        assert_eq!(
            verify_signature_at(body, "v1=abcd", SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_signature_at(body, "t=123", SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_signature_at(body, "t=abc,v1=00", SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::InvalidTimestamp)
        );
        assert_eq!(
            verify_signature_at(body, "t=1,v1=00", "", DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::EmptySecret)
        );
    }

    #[test]
    fn test_checkout_session_fields() {
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "client_reference_id": "u1",
                "customer": "cus_1",
                "payment_intent": "pi_1",
                "customer_details": { "email": "student@example.com" }
            }}
        }))
        .unwrap();

        assert_eq!(event.kind(), EventKind::CheckoutSessionCompleted);
        let session = event.checkout_session().unwrap();
        assert_eq!(session.user_id(), Some(UserId::from("u1")));
        assert_eq!(session.email(), Some("student@example.com"));
        assert_eq!(session.payment_intent.as_deref(), Some("pi_1"));
    }

    #[test]
    fn test_blank_client_reference_is_missing() {
        let session = CheckoutSession {
            client_reference_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(session.user_id().is_none());
    }

    #[test]
    fn test_other_event_kind() {
        let event: StripeEvent = serde_json::from_value(json!({
            "type": "invoice.paid",
            "data": { "object": {} }
        }))
        .unwrap();

        assert_eq!(event.kind(), EventKind::Other("invoice.paid".to_string()));
        assert!(event.id.is_none());
    }

    #[test]
    fn test_envelope_without_data() {
        let event: StripeEvent = serde_json::from_slice(br#"{"type":"ping"}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Other("ping".to_string()));
        assert!(event.data.is_none());

        let event: StripeEvent =
            serde_json::from_slice(br#"{"type":"checkout.session.completed"}"#).unwrap();
        assert!(event.checkout_session().is_err());
    }
}

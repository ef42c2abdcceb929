//! Payment Session Provider webhook verification and event envelope.
//!
//! The provider is opaque to this service: checkout, portal and webhook
//! session creation all happen on its side. The one inbound signal is a
//! signed "purchase completed" event whose metadata resolves to a
//! profile token and product id; signature verification authenticates
//! the provider, never caller-supplied identifiers.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Event type that commits inventory.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Errors from webhook verification or decoding.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing, malformed, or wrong.
    #[error("invalid webhook signature")]
    SignatureInvalid,

    /// Payload did not decode as an event envelope.
    #[error("invalid webhook payload: {0}")]
    PayloadInvalid(String),
}

/// Signed event envelope delivered by the provider.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    /// Distinct event id; the redelivery dedupe key.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub object: WebhookObject,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookObject {
    #[serde(default)]
    pub metadata: WebhookMetadata,
}

/// Metadata attached to the checkout session at creation time.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookMetadata {
    #[serde(rename = "editToken")]
    pub edit_token: Option<String>,
    #[serde(rename = "productId")]
    pub product_id: Option<String>,
}

/// Verify a webhook signature header.
///
/// Header format: `t=<unix timestamp>,v1=<hex hmac>`, where the HMAC is
/// SHA-256 over `"{t}.{payload}"` keyed with the shared webhook secret.
/// Comparison is constant-time.
///
/// # Errors
///
/// Returns `WebhookError::SignatureInvalid` on any mismatch or malformed
/// header; callers must reject the request before reading the payload.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<(), WebhookError> {
    let parts: std::collections::HashMap<&str, &str> = signature_header
        .split(',')
        .filter_map(|part| {
            let mut kv = part.splitn(2, '=');
            Some((kv.next()?.trim(), kv.next()?.trim()))
        })
        .collect();

    let timestamp = parts.get("t").ok_or(WebhookError::SignatureInvalid)?;
    let signature = parts.get("v1").ok_or(WebhookError::SignatureInvalid)?;

    let payload_str =
        std::str::from_utf8(payload).map_err(|_| WebhookError::SignatureInvalid)?;
    let signed_payload = format!("{timestamp}.{payload_str}");

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| WebhookError::SignatureInvalid)?;
    mac.update(signed_payload.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    if subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(WebhookError::SignatureInvalid)
    }
}

/// Decode a verified payload into the event envelope.
///
/// # Errors
///
/// Returns `WebhookError::PayloadInvalid` when the body is not an event.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
    serde_json::from_slice(payload).map_err(|e| WebhookError::PayloadInvalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], timestamp: &str, secret: &str) -> String {
        let signed = format!(
            "{timestamp}.{}",
            std::str::from_utf8(payload).expect("utf8 payload")
        );
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("mac");
        mac.update(signed.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_valid() {
        let secret = "whk_test_signing_key";
        let payload = br#"{"type":"test"}"#;
        let timestamp = "1714556800";

        let sig = sign(payload, timestamp, secret);
        let header = format!("t={timestamp},v1={sig}");
        assert!(verify_signature(payload, &header, secret).is_ok());
    }

    #[test]
    fn test_verify_signature_rejects_tampering() {
        let secret = "whk_test_signing_key";
        let payload = br#"{"type":"test"}"#;
        let timestamp = "1714556800";
        let sig = sign(payload, timestamp, secret);

        // Altered payload
        let header = format!("t={timestamp},v1={sig}");
        assert!(verify_signature(br#"{"type":"evil"}"#, &header, secret).is_err());

        // Altered timestamp
        let header = format!("t=1714556801,v1={sig}");
        assert!(verify_signature(payload, &header, secret).is_err());

        // Wrong secret
        let header = format!("t={timestamp},v1={sig}");
        assert!(verify_signature(payload, &header, "other_key").is_err());
    }

    #[test]
    fn test_verify_signature_rejects_malformed_headers() {
        let payload = b"{}";
        assert!(verify_signature(payload, "", "secret-key").is_err());
        assert!(verify_signature(payload, "t=123", "secret-key").is_err());
        assert!(verify_signature(payload, "v1=abc", "secret-key").is_err());
        assert!(verify_signature(payload, "garbage", "secret-key").is_err());
    }

    #[test]
    fn test_parse_event_extracts_metadata() {
        let payload = br#"{
            "id": "evt_123",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_456",
                    "metadata": {"editToken": "tok_abc", "productId": "p1"}
                }
            }
        }"#;
        let event = parse_event(payload).expect("parse");
        assert_eq!(event.id, "evt_123");
        assert_eq!(event.event_type, CHECKOUT_COMPLETED);
        assert_eq!(event.data.object.metadata.edit_token.as_deref(), Some("tok_abc"));
        assert_eq!(event.data.object.metadata.product_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_parse_event_tolerates_missing_metadata() {
        let payload = br#"{"id": "evt_1", "type": "invoice.paid"}"#;
        let event = parse_event(payload).expect("parse");
        assert!(event.data.object.metadata.edit_token.is_none());

        assert!(parse_event(b"not json").is_err());
    }
}

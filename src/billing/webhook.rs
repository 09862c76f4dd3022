use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

use crate::users::model::AccessGrant;

type HmacSha256 = Hmac<Sha256>;

/// Seconds a signed payload stays acceptable.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    NotConfigured,
    #[error("malformed Stripe-Signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Stale,
    #[error("no matching v1 signature")]
    Mismatch,
}

/// Checks a `Stripe-Signature` header (`t=...,v1=...`) against the raw body.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NotConfigured);
    }
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Stale);
    }

    let matches = candidates.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });
    if matches {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[derive(Debug, Clone)]
pub enum BillingEvent {
    CheckoutCompleted(AccessGrant),
    SubscriptionEnded { customer_id: String },
    Ignored(String),
}

pub fn parse_event(event: &Value) -> BillingEvent {
    let kind = event["type"].as_str().unwrap_or_default();
    let object = &event["data"]["object"];
    let text = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);
    match kind {
        "checkout.session.completed" => BillingEvent::CheckoutCompleted(AccessGrant {
            user_id: object["client_reference_id"]
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok()),
            email: text(&object["customer_details"]["email"])
                .or_else(|| text(&object["customer_email"]))
                .map(|e| e.to_lowercase()),
            customer_id: text(&object["customer"]),
            price_id: text(&object["metadata"]["price_id"]),
        }),
        "customer.subscription.deleted" => match text(&object["customer"]) {
            Some(customer_id) => BillingEvent::SubscriptionEnded { customer_id },
            None => BillingEvent::Ignored(kind.to_string()),
        },
        other => BillingEvent::Ignored(other.to_string()),
    }
}

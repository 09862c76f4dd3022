use axum::{extract::State, routing::post, Json, Router};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, instrument, warn};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

type HmacSha256 = Hmac<Sha256>;

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/mailgun", post(mailgun_webhook))
}

/// HMAC-SHA256 keyed by the signing key over `timestamp + token`, hex encoded.
pub fn verify_signature(signing_key: &str, timestamp: &str, token: &str, signature: &str) -> bool {
    if signing_key.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(signing_key.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn signature_fields(body: &Value) -> Option<(&str, &str, &str)> {
    let sig = body.get("signature")?;
    Some((
        sig.get("timestamp")?.as_str()?,
        sig.get("token")?.as_str()?,
        sig.get("signature")?.as_str()?,
    ))
}

#[instrument(skip(state, body))]
pub async fn mailgun_webhook(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    // anything unsigned or unparseable is treated as unauthenticated
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let verified = signature_fields(&payload).is_some_and(|(timestamp, token, signature)| {
        verify_signature(&state.config.mail.signing_key, timestamp, token, signature)
    });
    if !verified {
        warn!("mailgun webhook signature rejected");
        return Err(ApiError::unauthorized("Invalid signature"));
    }

    let event = &payload["event-data"];
    let kind = event["event"].as_str().unwrap_or("unknown");
    let recipient = event["recipient"].as_str().unwrap_or("");
    match kind {
        "failed" | "complained" | "unsubscribed" => {
            warn!(event = kind, %recipient, "mailgun delivery problem")
        }
        _ => info!(event = kind, %recipient, "mailgun event"),
    }
    Ok(Json(json!({ "success": true })))
}

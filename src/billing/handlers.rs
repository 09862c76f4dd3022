use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::{
    stripe::{CheckoutMode, CheckoutRequest},
    webhook::{parse_event, verify_signature, BillingEvent},
};
use crate::{
    auth::extractors::Identity,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    state::AppState,
};

pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/stripe/create-checkout", post(create_checkout))
        .route("/webhook/stripe", post(stripe_webhook))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub price_id: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub url: String,
}

fn required(field: Option<String>, name: &str) -> ApiResult<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{name} is required")))
}

#[instrument(skip(state, identity, body))]
pub async fn create_checkout(
    State(state): State<AppState>,
    identity: Option<Identity>,
    ApiJson(body): ApiJson<CreateCheckoutRequest>,
) -> ApiResult<Json<CreateCheckoutResponse>> {
    let price_id = required(body.price_id, "priceId")?;
    let success_url = required(body.success_url, "successUrl")?;
    let cancel_url = required(body.cancel_url, "cancelUrl")?;
    let mode = required(body.mode, "mode")?;
    let mode = CheckoutMode::parse(&mode)
        .ok_or_else(|| ApiError::bad_request("mode must be payment or subscription"))?;

    let mut request = CheckoutRequest {
        price_id,
        success_url,
        cancel_url,
        mode,
        customer_id: None,
        customer_email: None,
        client_reference_id: None,
    };
    if let Some(identity) = identity {
        if let Some(user) = state.users.find_by_id(identity.user_id()).await? {
            request.client_reference_id = Some(user.id.to_string());
            request.customer_id = user.customer_id;
            request.customer_email = Some(user.email);
        }
    }

    let session = state
        .billing
        .create_checkout_session(&request)
        .await
        .map_err(|e| {
            error!(error = %e, "create checkout session failed");
            ApiError::BadGateway("Could not create checkout session".into())
        })?;
    let url = session
        .url
        .ok_or_else(|| ApiError::BadGateway("Checkout session has no url".into()))?;
    info!(session_id = %session.id, "checkout session created");
    Ok(Json(CreateCheckoutResponse { url }))
}

#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing Stripe-Signature header"))?;
    verify_signature(
        &state.config.stripe.webhook_secret,
        signature,
        &body,
        OffsetDateTime::now_utc().unix_timestamp(),
    )
    .map_err(|e| {
        warn!(error = %e, "stripe webhook rejected");
        ApiError::bad_request("Invalid signature")
    })?;

    let event: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("Invalid event payload"))?;
    match parse_event(&event) {
        BillingEvent::CheckoutCompleted(grant) => {
            let updated = state.users.grant_access(&grant).await?;
            if updated {
                info!(user_id = ?grant.user_id, price_id = ?grant.price_id, "access granted");
            } else {
                warn!(user_id = ?grant.user_id, email = ?grant.email, "checkout for unknown user");
            }
        }
        BillingEvent::SubscriptionEnded { customer_id } => {
            let updated = state.users.revoke_access(&customer_id).await?;
            info!(%customer_id, updated, "access revoked");
        }
        BillingEvent::Ignored(kind) => info!(event = %kind, "stripe event ignored"),
    }
    Ok(Json(json!({ "received": true })))
}

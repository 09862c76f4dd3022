use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use super::repo::{Lead, NewLead};
use crate::{
    auth::extractors::AdminUser,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    mail::{send_best_effort, templates},
    state::AppState,
    validation::{normalize_email, optional_text, truncate_chars, Pagination},
};

const MAX_CONTACT_MESSAGE: usize = 5000;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/lead", post(create_lead))
        .route("/contact", post(contact))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/waitlist", get(list_waitlist).post(add_to_waitlist))
}

#[derive(Debug, Deserialize)]
pub struct LeadRequest {
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub source: Option<String>,
}

impl LeadRequest {
    fn into_new_lead(self, default_source: &str) -> ApiResult<NewLead> {
        Ok(NewLead {
            email: normalize_email(&self.email)?,
            name: optional_text(self.name),
            industry: optional_text(self.industry),
            source: optional_text(self.source).or_else(|| Some(default_source.to_string())),
            message: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub recaptcha_token: String,
}

#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub success: bool,
    pub lead: Lead,
}

#[derive(Debug, Serialize)]
pub struct WaitlistResponse {
    pub leads: Vec<Lead>,
    pub total: i64,
}

fn client_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[instrument(skip(state, body))]
pub async fn create_lead(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LeadRequest>,
) -> ApiResult<Json<LeadResponse>> {
    let new = body.into_new_lead("waitlist")?;
    let lead = state.leads.upsert(&new).await?;
    info!(lead_id = %lead.id, source = ?lead.source, "lead saved");
    Ok(Json(LeadResponse {
        success: true,
        lead,
    }))
}

#[instrument(skip(state, headers, body))]
pub async fn contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<ContactRequest>,
) -> ApiResult<Json<Value>> {
    let name = body.name.trim().to_string();
    let message = body.message.trim();
    if name.is_empty() || message.is_empty() {
        return Err(ApiError::bad_request("Name, email and message are required"));
    }
    let email = normalize_email(&body.email)?;
    if body.recaptcha_token.trim().is_empty() {
        return Err(ApiError::bad_request("reCAPTCHA token is required"));
    }

    let human = state
        .captcha
        .verify(body.recaptcha_token.trim(), client_ip(&headers))
        .await
        .map_err(|e| {
            error!(error = %e, "recaptcha verification failed");
            ApiError::BadGateway("Could not verify reCAPTCHA".into())
        })?;
    if !human {
        warn!(%email, "contact form failed recaptcha");
        return Err(ApiError::bad_request("reCAPTCHA verification failed"));
    }

    let message = truncate_chars(message, MAX_CONTACT_MESSAGE);
    let lead = state
        .leads
        .upsert(&NewLead {
            email: email.clone(),
            name: Some(name.clone()),
            industry: None,
            source: Some("contact".into()),
            message: Some(message.clone()),
        })
        .await?;
    info!(lead_id = %lead.id, "contact request saved");

    send_best_effort(
        state.mailer.as_ref(),
        templates::contact_request(&state.config.mail.support_email, &name, &email, &message),
    )
    .await;

    Ok(Json(json!({ "success": true })))
}

#[instrument(skip(state, _admin))]
pub async fn list_waitlist(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> ApiResult<Json<WaitlistResponse>> {
    let (limit, offset) = p.clamped();
    let leads = state.leads.list(limit, offset).await?;
    let total = state.leads.count().await?;
    Ok(Json(WaitlistResponse { leads, total }))
}

#[instrument(skip(state, _admin, body))]
pub async fn add_to_waitlist(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<LeadRequest>,
) -> ApiResult<(StatusCode, Json<LeadResponse>)> {
    let new = body.into_new_lead("admin")?;
    let lead = state.leads.upsert(&new).await?;
    info!(lead_id = %lead.id, "lead added by admin");
    Ok((
        StatusCode::CREATED,
        Json(LeadResponse {
            success: true,
            lead,
        }),
    ))
}

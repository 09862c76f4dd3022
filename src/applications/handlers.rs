use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo::{ApplicationStatus, JobApplication, NewApplication};
use crate::{
    auth::extractors::{AdminUser, Identity},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
    validation::optional_text,
};

pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/user/applications", get(list_own))
        .route(
            "/admin/users/:id/applications",
            get(admin_list).post(admin_create),
        )
}

#[derive(Debug, Serialize)]
pub struct ApplicationList {
    pub applications: Vec<JobApplication>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub employment_type: Option<String>,
    pub status: Option<ApplicationStatus>,
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn list_own(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<ApplicationList>> {
    let applications = state.applications.list_for_user(identity.user_id()).await?;
    Ok(Json(ApplicationList { applications }))
}

#[instrument(skip(state, _admin))]
pub async fn admin_list(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApplicationList>> {
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let applications = state.applications.list_for_user(user_id).await?;
    Ok(Json(ApplicationList { applications }))
}

#[instrument(skip(state, _admin, body))]
pub async fn admin_create(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateApplicationRequest>,
) -> ApiResult<(StatusCode, Json<JobApplication>)> {
    let title = body.title.trim();
    let company = body.company.trim();
    if title.is_empty() || company.is_empty() {
        return Err(ApiError::bad_request("title and company are required"));
    }
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let application = state
        .applications
        .insert(&NewApplication {
            user_id,
            title: title.to_string(),
            company: company.to_string(),
            location: optional_text(body.location),
            salary: optional_text(body.salary),
            job_type: optional_text(body.job_type),
            employment_type: optional_text(body.employment_type),
            status: body.status.unwrap_or(ApplicationStatus::Applied),
        })
        .await?;
    info!(application_id = %application.id, %user_id, "job application recorded");
    Ok((StatusCode::CREATED, Json(application)))
}

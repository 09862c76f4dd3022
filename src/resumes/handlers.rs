use axum::{
    extract::{
        multipart::MultipartRejection, DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{
    repo::NewResume,
    services::{
        ext_from_mime, owns_key, presign_many, upload_resume, ResumeView, UploadItem,
        DOWNLOAD_TTL_SECS, MAX_RESUME_BYTES,
    },
};
use crate::{
    auth::extractors::Identity,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    state::AppState,
};

pub fn resume_routes() -> Router<AppState> {
    Router::new()
        .route("/resumes", get(list_resumes).post(register_resume))
        .route(
            "/upload-resume",
            // multipart framing on top of the file itself
            post(upload).layer(DefaultBodyLimit::max(MAX_RESUME_BYTES + 64 * 1024)),
        )
}

#[derive(Debug, Serialize)]
pub struct ResumeList {
    pub resumes: Vec<ResumeView>,
}

#[derive(Debug, Serialize)]
pub struct ResumeCreated {
    pub success: bool,
    pub resume: ResumeView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResumeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub storage_key: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn list_resumes(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<ResumeList>> {
    let resumes = state.resumes.list_for_user(identity.user_id()).await?;
    let resumes = presign_many(&state, resumes, DOWNLOAD_TTL_SECS).await?;
    Ok(Json(ResumeList { resumes }))
}

#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id()))]
pub async fn register_resume(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(body): ApiJson<RegisterResumeRequest>,
) -> ApiResult<(StatusCode, Json<ResumeCreated>)> {
    let name = body.name.trim();
    let key = body.storage_key.trim();
    if name.is_empty() || key.is_empty() {
        return Err(ApiError::bad_request("name and storageKey are required"));
    }
    if !owns_key(identity.user_id(), key) {
        warn!(%key, "resume key outside caller prefix");
        return Err(ApiError::bad_request("storageKey is not in your upload area"));
    }
    let content_type = body
        .content_type
        .unwrap_or_else(|| "application/pdf".into());
    if ext_from_mime(&content_type).is_none() {
        return Err(ApiError::bad_request("Only PDF, DOC or DOCX resumes are accepted"));
    }

    let resume = state
        .resumes
        .insert(&NewResume {
            user_id: identity.user_id(),
            name: name.to_string(),
            storage_key: key.to_string(),
            content_type,
            size_bytes: body.size_bytes.unwrap_or(0).max(0),
        })
        .await?;
    info!(resume_id = %resume.id, "resume registered");
    let resume = presign_many(&state, vec![resume], DOWNLOAD_TTL_SECS)
        .await?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("presign returned nothing"))?;
    Ok((
        StatusCode::CREATED,
        Json(ResumeCreated {
            success: true,
            resume,
        }),
    ))
}

/// POST /upload-resume (multipart, field `file`)
#[instrument(skip(state, identity, mp), fields(user_id = %identity.user_id()))]
pub async fn upload(
    State(state): State<AppState>,
    identity: Identity,
    mp: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<ResumeCreated>)> {
    let mut mp = mp?;
    let mut item = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume").to_string();
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Could not read file: {e}")))?;
        item = Some(UploadItem {
            body,
            content_type,
            file_name,
        });
        break;
    }
    let item = item.ok_or_else(|| ApiError::bad_request("file is required"))?;

    let resume = upload_resume(&state, identity.user_id(), item).await?;
    info!(resume_id = %resume.id, key = %resume.storage_key, "resume uploaded");
    let resume = presign_many(&state, vec![resume], DOWNLOAD_TTL_SECS)
        .await?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("presign returned nothing"))?;
    Ok((
        StatusCode::CREATED,
        Json(ResumeCreated {
            success: true,
            resume,
        }),
    ))
}

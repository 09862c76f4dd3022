use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::repo::{Feedback, NewFeedback, Rating, MAX_NOTE_LEN};
use crate::{
    auth::extractors::Identity,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    state::AppState,
    validation::{optional_text, truncate_chars},
};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub feedback: Feedback,
}

fn parse_rating(raw: Option<&str>) -> ApiResult<Rating> {
    match raw.map(str::trim) {
        Some("sad") => Ok(Rating::Sad),
        Some("mid") => Ok(Rating::Mid),
        Some("happy") => Ok(Rating::Happy),
        Some(_) => Err(ApiError::bad_request("rating must be sad, mid or happy")),
        None => Err(ApiError::bad_request("rating is required")),
    }
}

#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id()))]
pub async fn submit_feedback(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(body): ApiJson<FeedbackRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackResponse>)> {
    let rating = parse_rating(body.rating.as_deref())?;
    let note = optional_text(body.note).map(|n| truncate_chars(&n, MAX_NOTE_LEN));
    let feedback = state
        .feedback
        .insert(&NewFeedback {
            user_id: identity.user_id(),
            email: identity.email().to_string(),
            rating,
            note,
        })
        .await?;
    info!(feedback_id = %feedback.id, rating = rating.as_str(), "feedback stored");
    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            success: true,
            feedback,
        }),
    ))
}

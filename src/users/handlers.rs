use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{
        ChangePasswordRequest, OnboardingStatusResponse, PreferencesRequest,
        PreferencesResponse, PublicUser, VerificationStatusResponse,
    },
    model::{Preferences, User},
};
use crate::{
    auth::{
        extractors::Identity,
        password::{hash_password, long_enough, verify_password},
    },
    error::{ApiError, ApiResult},
    extract::ApiJson,
    state::AppState,
    validation::optional_text,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/me", get(get_me))
        .route("/user/preferences", get(get_preferences).post(save_preferences))
        .route("/user/onboarding-status", get(onboarding_status))
        .route("/user/verification-status", get(verification_status))
        .route("/user/password", post(change_password))
}

pub(crate) async fn load_user(state: &AppState, identity: &Identity) -> ApiResult<User> {
    state
        .users
        .find_by_id(identity.user_id())
        .await?
        .ok_or_else(|| {
            warn!(user_id = %identity.user_id(), "session for missing user");
            ApiError::not_found("User not found")
        })
}

fn preferences_response(p: &Preferences) -> PreferencesResponse {
    PreferencesResponse {
        job_preferences: p.job_preferences.clone(),
        experience: p.experience.clone(),
        availability: p.availability.clone(),
        onboarding_complete: p.onboarding_complete,
    }
}

/// Applies submitted answers over the stored ones.
pub fn merge_preferences(current: &Preferences, body: PreferencesRequest) -> ApiResult<Preferences> {
    let job_preferences = match body.job_preferences {
        None | Some(Value::Null) => current.job_preferences.clone(),
        Some(v @ (Value::Object(_) | Value::Array(_))) => Some(v),
        Some(_) => {
            return Err(ApiError::bad_request(
                "jobPreferences must be an object or a list",
            ))
        }
    };
    let mut merged = Preferences {
        job_preferences,
        experience: optional_text(body.experience).or_else(|| current.experience.clone()),
        availability: optional_text(body.availability).or_else(|| current.availability.clone()),
        onboarding_complete: current.onboarding_complete,
    };
    // completion is sticky; later edits never send a user back to onboarding
    merged.onboarding_complete = merged.onboarding_complete || merged.is_complete();
    Ok(merged)
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn get_me(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<PublicUser>> {
    let user = load_user(&state, &identity).await?;
    Ok(Json(PublicUser::from(&user)))
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn get_preferences(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<PreferencesResponse>> {
    let user = load_user(&state, &identity).await?;
    Ok(Json(preferences_response(&Preferences::of(&user))))
}

#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id()))]
pub async fn save_preferences(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(body): ApiJson<PreferencesRequest>,
) -> ApiResult<Json<PreferencesResponse>> {
    let user = load_user(&state, &identity).await?;
    let merged = merge_preferences(&Preferences::of(&user), body)?;
    let saved = state
        .users
        .save_preferences(user.id, &merged)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if saved.onboarding_complete && !user.onboarding_complete {
        info!(user_id = %user.id, "onboarding completed");
    }
    Ok(Json(preferences_response(&Preferences::of(&saved))))
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn onboarding_status(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<OnboardingStatusResponse>> {
    let user = load_user(&state, &identity).await?;
    Ok(Json(OnboardingStatusResponse {
        onboarding_complete: user.onboarding_complete,
        has_plan: user.has_plan(),
        has_access: user.has_access,
    }))
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn verification_status(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<VerificationStatusResponse>> {
    let user = load_user(&state, &identity).await?;
    Ok(Json(VerificationStatusResponse {
        email_verified: user.email_verified,
    }))
}

#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id()))]
pub async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    if body.current_password.is_empty() || body.new_password.is_empty() {
        return Err(ApiError::bad_request("Current and new password are required"));
    }
    if !long_enough(&body.new_password) {
        return Err(ApiError::bad_request("Password too short"));
    }
    let user = load_user(&state, &identity).await?;
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(ApiError::bad_request(
            "This account signs in with a social provider and has no password",
        ));
    };
    let ok = verify_password(&body.current_password, hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        ApiError::Internal(e)
    })?;
    if !ok {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::bad_request("Current password is incorrect"));
    }
    let new_hash = hash_password(&body.new_password)?;
    state.users.set_password(user.id, &new_hash).await?;
    info!(user_id = %user.id, "password changed");
    Ok(Json(json!({ "success": true })))
}

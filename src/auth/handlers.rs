use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use super::{
    dto::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
        TokenRequest,
    },
    extractors::Identity,
    password::{hash_password, long_enough, verify_password},
    session::{cleared_cookie, session_cookie, SessionKeys},
    tokens::{consume_token, generate_token, TokenPurpose},
};
use crate::{
    error::{ApiError, ApiResult},
    extract::ApiJson,
    mail::{send_best_effort, templates},
    state::AppState,
    users::{
        dto::PublicUser,
        handlers::load_user,
        model::{NewUser, User},
    },
    validation::{normalize_email, optional_text},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/verify", post(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

/// Signs a session for `user` and builds the matching cookie.
fn issue_session(state: &AppState, user: &User) -> ApiResult<(Cookie<'static>, AuthResponse)> {
    let keys = SessionKeys::from_ref(state);
    let token = keys.sign(user).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::Internal(e)
    })?;
    let cookie = session_cookie(token.clone(), keys.ttl, state.config.secure_cookies());
    Ok((
        cookie,
        AuthResponse {
            token,
            user: PublicUser::from(user),
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email).map_err(|e| {
        warn!(email = %payload.email, "invalid email");
        e
    })?;

    if !long_enough(&payload.password) {
        warn!("password too short");
        return Err(ApiError::bad_request("Password too short"));
    }

    let hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        ApiError::Internal(e)
    })?;

    let created = state
        .users
        .create(&NewUser {
            email: email.clone(),
            name: optional_text(payload.name),
            password_hash: Some(hash),
        })
        .await?;
    let Some(user) = created else {
        warn!(%email, "email already registered");
        return Err(ApiError::bad_request("Email already registered"));
    };

    match generate_token(state.tokens.as_ref(), &user.email, TokenPurpose::VerifyEmail).await {
        Ok(token) => {
            send_best_effort(
                state.mailer.as_ref(),
                templates::verify_email(&user.email, &state.config.public_base_url, &token),
            )
            .await
        }
        Err(e) => warn!(error = %e, user_id = %user.id, "verification token not issued"),
    }

    let (cookie, body) = issue_session(&state, &user)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, jar.add(cookie), Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email)?;

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "password login on social account");
        return Err(ApiError::unauthorized(
            "This account uses social sign-in. Continue with your provider instead.",
        ));
    };

    let ok = verify_password(&payload.password, hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        ApiError::Internal(e)
    })?;
    if !ok {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let (cookie, body) = issue_session(&state, &user)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((jar.add(cookie), Json(body)))
}

/// Reissues the session with claims taken from the current user record.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn refresh(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let user = load_user(&state, &identity).await.map_err(|_| {
        warn!("refresh for missing user");
        ApiError::unauthorized("User not found")
    })?;
    let (cookie, body) = issue_session(&state, &user)?;
    Ok((jar.add(cookie), Json(body)))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(cleared_cookie()), Json(json!({ "success": true })))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let Some(email) =
        consume_token(state.tokens.as_ref(), &payload.token, TokenPurpose::VerifyEmail).await?
    else {
        warn!("invalid or expired verification token");
        return Err(ApiError::bad_request("Invalid or expired token"));
    };
    if !state.users.mark_email_verified(&email).await? {
        warn!(%email, "verification token for unknown account");
        return Err(ApiError::bad_request("Invalid or expired token"));
    }
    info!(%email, "email verified");
    Ok(Json(json!({ "success": true, "emailVerified": true })))
}

/// Always answers 200 so the endpoint does not reveal which emails exist.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let email = normalize_email(&payload.email)?;
    let ok = Json(json!({
        "success": true,
        "message": "If an account exists for this email, a reset link is on its way."
    }));

    let user = match state.users.find_by_email(&email).await? {
        Some(u) if u.password_hash.is_some() => u,
        Some(u) => {
            info!(user_id = %u.id, "reset requested for social account");
            return Ok(ok);
        }
        None => return Ok(ok),
    };

    match generate_token(state.tokens.as_ref(), &user.email, TokenPurpose::ResetPassword).await {
        Ok(token) => {
            send_best_effort(
                state.mailer.as_ref(),
                templates::reset_password(&user.email, &state.config.public_base_url, &token),
            )
            .await;
            info!(user_id = %user.id, "password reset issued");
        }
        Err(e) => error!(error = %e, user_id = %user.id, "reset token not issued"),
    }
    Ok(ok)
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if !long_enough(&payload.password) {
        return Err(ApiError::bad_request("Password too short"));
    }
    let Some(email) =
        consume_token(state.tokens.as_ref(), &payload.token, TokenPurpose::ResetPassword).await?
    else {
        warn!("invalid or expired reset token");
        return Err(ApiError::bad_request("Invalid or expired token"));
    };
    let Some(user) = state.users.find_by_email(&email).await? else {
        return Err(ApiError::bad_request("Invalid or expired token"));
    };

    let hash = hash_password(&payload.password)?;
    state.users.set_password(user.id, &hash).await?;
    info!(user_id = %user.id, "password reset");
    Ok(Json(json!({ "success": true })))
}

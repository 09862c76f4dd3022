use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::model::{validate_content, MarkReadOutcome, Message, MessageAuthor};
use crate::{
    auth::extractors::{AdminUser, Identity},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    mail::{send_best_effort, templates},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/messages", get(list_own).post(send_own))
        .route("/user/messages/read", patch(mark_own_read))
        .route("/user/messages/:id/read", patch(mark_one_own_read))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/users/:id/messages",
            get(admin_list).post(admin_send),
        )
        .route("/admin/users/:id/messages/read", patch(admin_mark_read))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    pub messages: Vec<Message>,
    /// Unread messages written by the other side.
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageCreated {
    pub message: Message,
}

fn listing(messages: Vec<Message>, other_side: MessageAuthor) -> MessageList {
    let unread_count = messages
        .iter()
        .filter(|m| m.from == other_side && !m.read)
        .count();
    MessageList {
        messages,
        unread_count,
    }
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn list_own(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<MessageList>> {
    let messages = state.messages.list_for_user(identity.user_id()).await?;
    Ok(Json(listing(messages, MessageAuthor::Admin)))
}

#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id()))]
pub async fn send_own(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageCreated>)> {
    let content = validate_content(&body.content).map_err(ApiError::bad_request)?;
    let message = state
        .messages
        .append(identity.user_id(), MessageAuthor::User, content)
        .await?;
    info!(message_id = %message.id, "user message stored");
    Ok((StatusCode::CREATED, Json(MessageCreated { message })))
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn mark_own_read(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<MarkReadOutcome>> {
    let modified = state
        .messages
        .mark_read(identity.user_id(), MessageAuthor::Admin)
        .await?;
    Ok(Json(MarkReadOutcome::from_count(modified)))
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn mark_one_own_read(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MarkReadOutcome>> {
    let changed = state
        .messages
        .mark_one_read(identity.user_id(), id, MessageAuthor::Admin)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    Ok(Json(MarkReadOutcome::from_count(u64::from(changed))))
}

#[instrument(skip(state, _admin))]
pub async fn admin_list(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageList>> {
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let messages = state.messages.list_for_user(user_id).await?;
    Ok(Json(listing(messages, MessageAuthor::User)))
}

#[instrument(skip(state, admin, body))]
pub async fn admin_send(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageCreated>)> {
    let content = validate_content(&body.content).map_err(ApiError::bad_request)?;
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let message = state
        .messages
        .append(user.id, MessageAuthor::Admin, content)
        .await?;
    info!(message_id = %message.id, admin_id = %admin.0.user_id(), %user_id, "admin message stored");

    // the message is already stored; a mail failure must not undo that
    send_best_effort(
        state.mailer.as_ref(),
        templates::new_message(&user.email, user.name.as_deref(), &state.config.public_base_url),
    )
    .await;

    Ok((StatusCode::CREATED, Json(MessageCreated { message })))
}

#[instrument(skip(state, _admin))]
pub async fn admin_mark_read(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<MarkReadOutcome>> {
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let modified = state.messages.mark_read(user_id, MessageAuthor::User).await?;
    Ok(Json(MarkReadOutcome::from_count(modified)))
}

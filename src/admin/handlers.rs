use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::stats::{revenue_by_plan, AdminStats};
use crate::{
    auth::extractors::AdminUser,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    messages::model::MessageAuthor,
    state::AppState,
    users::{
        dto::AdminUserView,
        model::{AdminFields, User},
    },
    validation::{optional_text, Pagination},
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user).put(update_user))
        .route("/admin/stats", get(stats))
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<AdminUserView>,
    pub total: i64,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub has_access: Option<bool>,
    pub price_id: Option<String>,
    pub onboarding_complete: Option<bool>,
    pub is_admin: Option<bool>,
}

impl UpdateUserRequest {
    pub fn apply(self, current: &User) -> AdminFields {
        let mut fields = AdminFields::of(current);
        if let Some(name) = self.name {
            fields.name = optional_text(Some(name));
        }
        if let Some(v) = self.has_access {
            fields.has_access = v;
        }
        // an empty string clears the plan
        if let Some(price) = self.price_id {
            fields.price_id = optional_text(Some(price));
        }
        if let Some(v) = self.onboarding_complete {
            fields.onboarding_complete = v;
        }
        if let Some(v) = self.is_admin {
            fields.is_admin = v;
        }
        fields
    }
}

async fn find_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.user_id()))]
pub async fn list_users(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> ApiResult<Json<UserList>> {
    let (limit, offset) = p.clamped();
    let users = state.users.list(limit, offset).await?;
    let total = state.users.counts().await?.total;
    Ok(Json(UserList {
        users: users.into_iter().map(AdminUserView::from).collect(),
        total,
    }))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.user_id()))]
pub async fn get_user(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<AdminUserView>> {
    Ok(Json(AdminUserView::from(find_user(&state, id).await?)))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.0.user_id()))]
pub async fn update_user(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<AdminUserView>> {
    let current = find_user(&state, id).await?;
    let fields = body.apply(&current);
    let updated = state
        .users
        .update_admin_fields(id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(user_id = %id, has_access = fields.has_access, is_admin = fields.is_admin, "user updated by admin");
    Ok(Json(AdminUserView::from(updated)))
}

#[instrument(skip(state, _admin))]
pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<AdminStats>> {
    let users = state.users.counts().await?;
    let leads = state.leads.count().await?;
    let unread_user_messages = state.messages.count_unread(MessageAuthor::User).await?;
    let subscribers = state.users.subscribers_by_price().await?;
    let (plans, estimated_mrr_cents) = revenue_by_plan(subscribers, &state.config.stripe.plan_amounts);
    Ok(Json(AdminStats {
        users,
        leads,
        unread_user_messages,
        plans,
        estimated_mrr_cents,
    }))
}

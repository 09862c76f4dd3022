use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::Claims, session::SessionKeys};
use crate::{error::ApiError, state::AppState};

/// The single admin capability check used by extractors and the gate.
pub fn is_admin(identity: &Claims) -> bool {
    identity.is_admin
}

/// Authenticated caller, resolved from the session cookie or bearer token.
#[derive(Debug, Clone)]
pub struct Identity(pub Claims);

impl Identity {
    pub fn user_id(&self) -> Uuid {
        self.0.sub
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        keys.resolve(&parts.headers)
            .map(Identity)
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}

/// Caller holding the admin capability, confirmed against the stored account.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        if !is_admin(&identity.0) {
            warn!(user_id = %identity.user_id(), "admin route denied");
            return Err(ApiError::forbidden("Forbidden"));
        }
        // the claim outlives a demotion until the token expires
        let current = state.users.find_by_id(identity.user_id()).await?;
        let keys = SessionKeys::from_ref(state);
        if !current.is_some_and(|user| keys.grants_admin(&user)) {
            warn!(user_id = %identity.user_id(), "admin claim no longer backed by account");
            return Err(ApiError::forbidden("Forbidden"));
        }
        Ok(AdminUser(identity))
    }
}

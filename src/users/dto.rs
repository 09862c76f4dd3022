use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::User;

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub email_verified: bool,
    pub onboarding_complete: bool,
    pub has_access: bool,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            image: u.image.clone(),
            email_verified: u.email_verified,
            onboarding_complete: u.onboarding_complete,
            has_access: u.has_access,
        }
    }
}

/// Everything an admin sees about a user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub email_verified: bool,
    pub is_admin: bool,
    pub has_password: bool,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
    pub has_access: bool,
    pub onboarding_complete: bool,
    pub job_preferences: Option<serde_json::Value>,
    pub experience: Option<String>,
    pub availability: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for AdminUserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            image: u.image,
            email_verified: u.email_verified,
            is_admin: u.is_admin,
            has_password: u.password_hash.is_some(),
            customer_id: u.customer_id,
            price_id: u.price_id,
            has_access: u.has_access,
            onboarding_complete: u.onboarding_complete,
            job_preferences: u.job_preferences,
            experience: u.experience,
            availability: u.availability,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub job_preferences: Option<serde_json::Value>,
    pub experience: Option<String>,
    pub availability: Option<String>,
    pub onboarding_complete: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub job_preferences: Option<serde_json::Value>,
    pub experience: Option<String>,
    pub availability: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatusResponse {
    pub onboarding_complete: bool,
    pub has_plan: bool,
    pub has_access: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatusResponse {
    pub email_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

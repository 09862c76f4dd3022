use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload carried by the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,      // user ID
    pub email: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(rename = "onboardingComplete", default)]
    pub onboarding_complete: bool,
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}

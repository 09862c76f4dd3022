use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    /// Argon2 hash. `None` for accounts created through an OAuth provider.
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub is_admin: bool,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
    pub has_access: bool,
    pub onboarding_complete: bool,
    pub job_preferences: Option<serde_json::Value>,
    pub experience: Option<String>,
    pub availability: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn has_plan(&self) -> bool {
        self.price_id.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    pub fn status(&self) -> AccountStatus {
        AccountStatus {
            email_verified: self.email_verified,
            onboarding_complete: self.onboarding_complete,
            has_plan: self.has_plan(),
        }
    }
}

/// The slice of a user the access gate decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    pub email_verified: bool,
    pub onboarding_complete: bool,
    pub has_plan: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

/// Onboarding answers as persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub job_preferences: Option<serde_json::Value>,
    pub experience: Option<String>,
    pub availability: Option<String>,
    pub onboarding_complete: bool,
}

impl Preferences {
    pub fn of(user: &User) -> Self {
        Self {
            job_preferences: user.job_preferences.clone(),
            experience: user.experience.clone(),
            availability: user.availability.clone(),
            onboarding_complete: user.onboarding_complete,
        }
    }

    /// Every step of the flow has an answer.
    pub fn is_complete(&self) -> bool {
        let prefs = match &self.job_preferences {
            Some(serde_json::Value::Object(m)) => !m.is_empty(),
            Some(serde_json::Value::Array(a)) => !a.is_empty(),
            Some(serde_json::Value::Null) | None => false,
            Some(_) => true,
        };
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        prefs && filled(&self.experience) && filled(&self.availability)
    }
}

/// Fields an admin may change on a user.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminFields {
    pub name: Option<String>,
    pub has_access: bool,
    pub price_id: Option<String>,
    pub onboarding_complete: bool,
    pub is_admin: bool,
}

impl AdminFields {
    pub fn of(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            has_access: user.has_access,
            price_id: user.price_id.clone(),
            onboarding_complete: user.onboarding_complete,
            is_admin: user.is_admin,
        }
    }
}

/// Billing linkage written by the Stripe webhook.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    pub total: i64,
    pub verified: i64,
    pub onboarded: i64,
    pub paying: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prefs(job: Option<serde_json::Value>, exp: Option<&str>, avail: Option<&str>) -> Preferences {
        Preferences {
            job_preferences: job,
            experience: exp.map(Into::into),
            availability: avail.map(Into::into),
            onboarding_complete: false,
        }
    }

    #[test]
    fn complete_needs_every_step() {
        let full = prefs(Some(json!({"roles": ["backend"]})), Some("5 years"), Some("immediately"));
        assert!(full.is_complete());

        assert!(!prefs(None, Some("5 years"), Some("now")).is_complete());
        assert!(!prefs(Some(json!({})), Some("5 years"), Some("now")).is_complete());
        assert!(!prefs(Some(json!({"a": 1})), Some("  "), Some("now")).is_complete());
        assert!(!prefs(Some(json!({"a": 1})), Some("5 years"), None).is_complete());
    }
}

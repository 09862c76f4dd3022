use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::model::{AccessGrant, AdminFields, NewUser, Preferences, User, UserCounts};
use crate::db::PgStore;

const USER_COLUMNS: &str = r#"
    id, email, name, image, password_hash, email_verified, is_admin,
    customer_id, price_id, has_access, onboarding_complete,
    job_preferences, experience, availability, created_at, updated_at
"#;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Inserts unless the email is taken; `None` means it was.
    async fn create(&self, new: &NewUser) -> anyhow::Result<Option<User>>;
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    async fn mark_email_verified(&self, email: &str) -> anyhow::Result<bool>;
    async fn save_preferences(&self, id: Uuid, prefs: &Preferences)
        -> anyhow::Result<Option<User>>;
    async fn update_admin_fields(&self, id: Uuid, fields: &AdminFields)
        -> anyhow::Result<Option<User>>;
    /// Matches by user id first, then email. Returns whether a row changed.
    async fn grant_access(&self, grant: &AccessGrant) -> anyhow::Result<bool>;
    async fn revoke_access(&self, customer_id: &str) -> anyhow::Result<bool>;
    async fn counts(&self) -> anyhow::Result<UserCounts>;
    /// Paying subscribers per price id.
    async fn subscribers_by_price(&self) -> anyhow::Result<Vec<(String, i64)>>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create(&self, new: &NewUser) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await
            .context("update password")?;
        Ok(())
    }

    async fn mark_email_verified(&self, email: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET email_verified = TRUE, updated_at = now() WHERE email = $1",
        )
        .bind(email)
        .execute(&self.db)
        .await
        .context("mark email verified")?;
        Ok(res.rows_affected() > 0)
    }

    async fn save_preferences(
        &self,
        id: Uuid,
        prefs: &Preferences,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET job_preferences = $2,
                   experience = $3,
                   availability = $4,
                   onboarding_complete = $5,
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&prefs.job_preferences)
        .bind(&prefs.experience)
        .bind(&prefs.availability)
        .bind(prefs.onboarding_complete)
        .fetch_optional(&self.db)
        .await
        .context("save preferences")?;
        Ok(user)
    }

    async fn update_admin_fields(
        &self,
        id: Uuid,
        fields: &AdminFields,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name = $2,
                   has_access = $3,
                   price_id = $4,
                   onboarding_complete = $5,
                   is_admin = $6,
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(fields.has_access)
        .bind(&fields.price_id)
        .bind(fields.onboarding_complete)
        .bind(fields.is_admin)
        .fetch_optional(&self.db)
        .await
        .context("admin update user")?;
        Ok(user)
    }

    async fn grant_access(&self, grant: &AccessGrant) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET has_access = TRUE,
                   customer_id = COALESCE($3, customer_id),
                   price_id = COALESCE($4, price_id),
                   updated_at = now()
             WHERE ($1::uuid IS NOT NULL AND id = $1)
                OR ($1::uuid IS NULL AND email = $2)
            "#,
        )
        .bind(grant.user_id)
        .bind(&grant.email)
        .bind(&grant.customer_id)
        .bind(&grant.price_id)
        .execute(&self.db)
        .await
        .context("grant access")?;
        Ok(res.rows_affected() > 0)
    }

    async fn revoke_access(&self, customer_id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET has_access = FALSE, price_id = NULL, updated_at = now() WHERE customer_id = $1",
        )
        .bind(customer_id)
        .execute(&self.db)
        .await
        .context("revoke access")?;
        Ok(res.rows_affected() > 0)
    }

    async fn counts(&self) -> anyhow::Result<UserCounts> {
        let (total, verified, onboarded, paying): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE email_verified),
                   COUNT(*) FILTER (WHERE onboarding_complete),
                   COUNT(*) FILTER (WHERE has_access)
              FROM users
            "#,
        )
        .fetch_one(&self.db)
        .await
        .context("count users")?;
        Ok(UserCounts {
            total,
            verified,
            onboarded,
            paying,
        })
    }

    async fn subscribers_by_price(&self) -> anyhow::Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT price_id, COUNT(*)
              FROM users
             WHERE has_access AND price_id IS NOT NULL
             GROUP BY price_id
             ORDER BY price_id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("subscribers by price")?;
        Ok(rows)
    }
}

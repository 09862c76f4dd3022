//! Single-use tokens for email verification and password reset.
//!
//! The raw token goes to the user by mail; only its SHA-256 fingerprint is
//! stored. Consuming a token deletes it, so a second use fails.

use anyhow::Context;
use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::db::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    VerifyEmail,
    ResetPassword,
}

impl TokenPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VerifyEmail => "verify_email",
            Self::ResetPassword => "reset_password",
        }
    }

    pub fn ttl(self) -> Duration {
        match self {
            Self::VerifyEmail => Duration::hours(24),
            Self::ResetPassword => Duration::hours(1),
        }
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores a fingerprint, replacing earlier tokens of the same purpose for `email`.
    async fn replace(
        &self,
        email: &str,
        purpose: TokenPurpose,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Removes and returns `(email, expires_at)` for the fingerprint.
    async fn take(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> anyhow::Result<Option<(String, OffsetDateTime)>>;
}

pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// `generateToken(email) -> token`
pub async fn generate_token(
    store: &dyn TokenStore,
    email: &str,
    purpose: TokenPurpose,
) -> anyhow::Result<String> {
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    let token = hex::encode(raw);
    let expires_at = OffsetDateTime::now_utc() + purpose.ttl();
    store
        .replace(email, purpose, &fingerprint(&token), expires_at)
        .await?;
    Ok(token)
}

/// `consumeToken(token) -> email`; `None` for unknown, used or expired tokens.
pub async fn consume_token(
    store: &dyn TokenStore,
    token: &str,
    purpose: TokenPurpose,
) -> anyhow::Result<Option<String>> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }
    let Some((email, expires_at)) = store.take(&fingerprint(token), purpose).await? else {
        return Ok(None);
    };
    if expires_at <= OffsetDateTime::now_utc() {
        return Ok(None);
    }
    Ok(Some(email))
}

#[async_trait]
impl TokenStore for PgStore {
    async fn replace(
        &self,
        email: &str,
        purpose: TokenPurpose,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query("DELETE FROM auth_tokens WHERE email = $1 AND purpose = $2")
            .bind(email)
            .bind(purpose.as_str())
            .execute(&mut *tx)
            .await
            .context("delete previous tokens")?;
        sqlx::query(
            "INSERT INTO auth_tokens (token_hash, email, purpose, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(token_hash)
        .bind(email)
        .bind(purpose.as_str())
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .context("insert token")?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn take(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> anyhow::Result<Option<(String, OffsetDateTime)>> {
        let row = sqlx::query_as::<_, (String, OffsetDateTime)>(
            r#"
            DELETE FROM auth_tokens
             WHERE token_hash = $1 AND purpose = $2
            RETURNING email, expires_at
            "#,
        )
        .bind(token_hash)
        .bind(purpose.as_str())
        .fetch_optional(&self.db)
        .await
        .context("consume token")?;
        Ok(row)
    }
}

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::PgStore;

/// Waitlist or contact-form entry, one per email.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub source: Option<String>,
    pub message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub email: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub source: Option<String>,
    pub message: Option<String>,
}

#[async_trait]
pub trait LeadRepo: Send + Sync {
    /// Atomic insert-or-update keyed by email. Absent fields keep their stored value.
    async fn upsert(&self, lead: &NewLead) -> anyhow::Result<Lead>;
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Lead>>;
    async fn count(&self) -> anyhow::Result<i64>;
}

#[async_trait]
impl LeadRepo for PgStore {
    async fn upsert(&self, lead: &NewLead) -> anyhow::Result<Lead> {
        let row = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (email, name, industry, source, message)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
               SET name     = COALESCE(EXCLUDED.name, leads.name),
                   industry = COALESCE(EXCLUDED.industry, leads.industry),
                   source   = COALESCE(EXCLUDED.source, leads.source),
                   message  = COALESCE(EXCLUDED.message, leads.message),
                   updated_at = now()
            RETURNING id, email, name, industry, source, message, created_at, updated_at
            "#,
        )
        .bind(&lead.email)
        .bind(&lead.name)
        .bind(&lead.industry)
        .bind(&lead.source)
        .bind(&lead.message)
        .fetch_one(&self.db)
        .await
        .context("upsert lead")?;
        Ok(row)
    }

    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Lead>> {
        let rows = sqlx::query_as::<_, Lead>(
            r#"
            SELECT id, email, name, industry, source, message, created_at, updated_at
              FROM leads
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list leads")?;
        Ok(rows)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
            .fetch_one(&self.db)
            .await
            .context("count leads")?;
        Ok(count)
    }
}

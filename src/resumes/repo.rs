use anyhow::Context;
use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::PgStore;

#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct Resume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewResume {
    pub user_id: Uuid,
    pub name: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[async_trait]
pub trait ResumeRepo: Send + Sync {
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Resume>>;
    async fn insert(&self, resume: &NewResume) -> anyhow::Result<Resume>;
}

#[async_trait]
impl ResumeRepo for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Resume>> {
        let rows = sqlx::query_as::<_, Resume>(
            r#"
            SELECT id, user_id, name, storage_key, content_type, size_bytes, created_at
              FROM resumes
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list resumes")?;
        Ok(rows)
    }

    async fn insert(&self, resume: &NewResume) -> anyhow::Result<Resume> {
        let row = sqlx::query_as::<_, Resume>(
            r#"
            INSERT INTO resumes (user_id, name, storage_key, content_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, name, storage_key, content_type, size_bytes, created_at
            "#,
        )
        .bind(resume.user_id)
        .bind(&resume.name)
        .bind(&resume.storage_key)
        .bind(&resume.content_type)
        .bind(resume.size_bytes)
        .fetch_one(&self.db)
        .await
        .context("insert resume")?;
        Ok(row)
    }
}

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Interviewing,
    Offered,
    Rejected,
    Accepted,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Interviewing => "interviewing",
            Self::Offered => "offered",
            Self::Rejected => "rejected",
            Self::Accepted => "accepted",
        }
    }
}

/// Application submitted on a user's behalf.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub employment_type: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub user_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub employment_type: Option<String>,
    pub status: ApplicationStatus,
}

#[async_trait]
pub trait ApplicationRepo: Send + Sync {
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<JobApplication>>;
    async fn insert(&self, app: &NewApplication) -> anyhow::Result<JobApplication>;
}

#[async_trait]
impl ApplicationRepo for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<JobApplication>> {
        let rows = sqlx::query_as::<_, JobApplication>(
            r#"
            SELECT id, user_id, title, company, location, salary, job_type,
                   employment_type, status, created_at, updated_at
              FROM job_applications
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list job applications")?;
        Ok(rows)
    }

    async fn insert(&self, app: &NewApplication) -> anyhow::Result<JobApplication> {
        let row = sqlx::query_as::<_, JobApplication>(
            r#"
            INSERT INTO job_applications
                (user_id, title, company, location, salary, job_type, employment_type, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, title, company, location, salary, job_type,
                      employment_type, status, created_at, updated_at
            "#,
        )
        .bind(app.user_id)
        .bind(&app.title)
        .bind(&app.company)
        .bind(&app.location)
        .bind(&app.salary)
        .bind(&app.job_type)
        .bind(&app.employment_type)
        .bind(app.status.as_str())
        .fetch_one(&self.db)
        .await
        .context("insert job application")?;
        Ok(row)
    }
}

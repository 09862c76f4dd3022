use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::PgStore;

pub const MAX_NOTE_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Sad,
    Mid,
    Happy,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sad => "sad",
            Self::Mid => "mid",
            Self::Happy => "happy",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub user_id: Uuid,
    pub email: String,
    pub rating: Rating,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub rating: String,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait FeedbackRepo: Send + Sync {
    async fn insert(&self, feedback: &NewFeedback) -> anyhow::Result<Feedback>;
}

#[async_trait]
impl FeedbackRepo for PgStore {
    async fn insert(&self, feedback: &NewFeedback) -> anyhow::Result<Feedback> {
        let row = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (user_id, email, rating, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, email, rating, note, created_at
            "#,
        )
        .bind(feedback.user_id)
        .bind(&feedback.email)
        .bind(feedback.rating.as_str())
        .bind(&feedback.note)
        .fetch_one(&self.db)
        .await
        .context("insert feedback")?;
        Ok(row)
    }
}

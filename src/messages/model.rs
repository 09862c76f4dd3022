use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_MESSAGE_LEN: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    Admin,
    User,
}

impl MessageAuthor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => anyhow::bail!("unknown message author {other:?}"),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub from_role: String,
    pub content: String,
    pub read: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub from: MessageAuthor,
    pub content: String,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(r: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            from: MessageAuthor::parse(&r.from_role)?,
            content: r.content,
            read: r.read,
            created_at: r.created_at,
        })
    }
}

/// Result of a mark-read call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadOutcome {
    pub success: bool,
    pub update_performed: bool,
    pub modified_count: u64,
}

impl MarkReadOutcome {
    pub fn from_count(modified_count: u64) -> Self {
        Self {
            success: true,
            update_performed: modified_count > 0,
            modified_count,
        }
    }
}

/// Trimmed content, or why it is unacceptable.
pub fn validate_content(raw: &str) -> Result<&str, &'static str> {
    let content = raw.trim();
    if content.is_empty() {
        return Err("Message content is required");
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err("Message is too long");
    }
    Ok(content)
}

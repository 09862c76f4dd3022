use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Message, MessageAuthor, MessageRow};
use crate::db::PgStore;

#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Oldest first.
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Message>>;
    async fn append(
        &self,
        user_id: Uuid,
        from: MessageAuthor,
        content: &str,
    ) -> anyhow::Result<Message>;
    /// Marks every unread message written by `from` as read; returns how many changed.
    async fn mark_read(&self, user_id: Uuid, from: MessageAuthor) -> anyhow::Result<u64>;
    /// `None` when no such message by `from` exists; otherwise whether it changed.
    async fn mark_one_read(
        &self,
        user_id: Uuid,
        message_id: Uuid,
        from: MessageAuthor,
    ) -> anyhow::Result<Option<bool>>;
    async fn count_unread(&self, from: MessageAuthor) -> anyhow::Result<i64>;
}

#[async_trait]
impl MessageRepo for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, user_id, from_role, content, read, created_at
              FROM messages
             WHERE user_id = $1
             ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list messages")?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn append(
        &self,
        user_id: Uuid,
        from: MessageAuthor,
        content: &str,
    ) -> anyhow::Result<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (user_id, from_role, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, from_role, content, read, created_at
            "#,
        )
        .bind(user_id)
        .bind(from.as_str())
        .bind(content)
        .fetch_one(&self.db)
        .await
        .context("insert message")?;
        Message::try_from(row)
    }

    async fn mark_read(&self, user_id: Uuid, from: MessageAuthor) -> anyhow::Result<u64> {
        let res = sqlx::query(
            "UPDATE messages SET read = TRUE WHERE user_id = $1 AND from_role = $2 AND NOT read",
        )
        .bind(user_id)
        .bind(from.as_str())
        .execute(&self.db)
        .await
        .context("mark messages read")?;
        Ok(res.rows_affected())
    }

    async fn mark_one_read(
        &self,
        user_id: Uuid,
        message_id: Uuid,
        from: MessageAuthor,
    ) -> anyhow::Result<Option<bool>> {
        // the CTE reports the previous flag so a no-op is distinguishable from a miss
        let row = sqlx::query_as::<_, (bool,)>(
            r#"
            WITH target AS (
                SELECT id, read AS was_read
                  FROM messages
                 WHERE id = $1 AND user_id = $2 AND from_role = $3
            ), updated AS (
                UPDATE messages m SET read = TRUE
                  FROM target t
                 WHERE m.id = t.id AND NOT t.was_read
                RETURNING m.id
            )
            SELECT NOT was_read FROM target
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(from.as_str())
        .fetch_optional(&self.db)
        .await
        .context("mark message read")?;
        Ok(row.map(|(changed,)| changed))
    }

    async fn count_unread(&self, from: MessageAuthor) -> anyhow::Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE from_role = $1 AND NOT read")
                .bind(from.as_str())
                .fetch_one(&self.db)
                .await
                .context("count unread messages")?;
        Ok(count)
    }
}

use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct ReadMarkRow {
    pub conversation_id: i64,
    pub user_id: i64,
    pub last_read_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for ReadMarkRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let last_read_at_raw: String = row.try_get("last_read_at")?;
        Ok(Self {
            conversation_id: row.try_get("conversation_id")?,
            user_id: row.try_get("user_id")?,
            last_read_at: datetime_from_db_text(&last_read_at_raw)?,
        })
    }
}

/// Advance a user's read watermark for a conversation. The mark only moves
/// forward; a stale client re-sending an older timestamp is a no-op.
pub async fn upsert_mark(
    pool: &DbPool,
    conversation_id: i64,
    user_id: i64,
    last_read_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO read_marks (conversation_id, user_id, last_read_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (conversation_id, user_id)
         DO UPDATE SET last_read_at = excluded.last_read_at
         WHERE excluded.last_read_at > read_marks.last_read_at",
    )
    .bind(conversation_id)
    .bind(user_id)
    .bind(datetime_to_db_text(last_read_at))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_mark(
    pool: &DbPool,
    conversation_id: i64,
    user_id: i64,
) -> Result<Option<ReadMarkRow>, DbError> {
    let row = sqlx::query_as::<_, ReadMarkRow>(
        "SELECT conversation_id, user_id, last_read_at
         FROM read_marks
         WHERE conversation_id = $1 AND user_id = $2",
    )
    .bind(conversation_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Unread count for one conversation from the reader's perspective: messages
/// from the other participant sent after the watermark. No watermark row
/// counts everything the peer ever sent.
pub async fn count_unread(
    pool: &DbPool,
    conversation_id: i64,
    user_id: i64,
) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM messages m
         WHERE m.conversation_id = $1
           AND m.author_id != $2
           AND m.sent_at > COALESCE(
                 (SELECT r.last_read_at FROM read_marks r
                  WHERE r.conversation_id = $1 AND r.user_id = $2),
                 '')",
    )
    .bind(conversation_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

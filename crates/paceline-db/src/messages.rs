use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub author_id: i64,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for MessageRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let sent_at_raw: String = row.try_get("sent_at")?;
        let updated_at_raw: Option<String> = row.try_get("updated_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            author_id: row.try_get("author_id")?,
            text: row.try_get("text")?,
            sent_at: datetime_from_db_text(&sent_at_raw)?,
            updated_at: updated_at_raw
                .as_deref()
                .map(datetime_from_db_text)
                .transpose()?,
        })
    }
}

/// Append a message to a conversation's log. `sent_at` is assigned here, at
/// the storage boundary; it is the single ordering authority for the
/// conversation. Also bumps the conversation's `last_message_at`.
pub async fn create_message(
    pool: &DbPool,
    id: i64,
    conversation_id: i64,
    author_id: i64,
    text: &str,
) -> Result<MessageRow, DbError> {
    let sent_at = Utc::now();
    let row = sqlx::query_as::<_, MessageRow>(
        "INSERT INTO messages (id, conversation_id, author_id, text, sent_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, conversation_id, author_id, text, sent_at, updated_at",
    )
    .bind(id)
    .bind(conversation_id)
    .bind(author_id)
    .bind(text)
    .bind(datetime_to_db_text(sent_at))
    .fetch_one(pool)
    .await?;

    crate::conversations::touch_last_message(pool, conversation_id, sent_at).await?;

    Ok(row)
}

pub async fn get_message(pool: &DbPool, id: i64) -> Result<Option<MessageRow>, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(
        "SELECT id, conversation_id, author_id, text, sent_at, updated_at
         FROM messages WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// One backward-pagination window: the `limit` newest messages strictly
/// earlier than `before` (or the newest overall when absent), returned in
/// chronological ascending order as a chat view appends them.
pub async fn page_messages(
    pool: &DbPool,
    conversation_id: i64,
    before: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<MessageRow>, DbError> {
    let limit = limit.clamp(1, 100);
    let mut rows = match before {
        Some(cursor) => {
            sqlx::query_as::<_, MessageRow>(
                "SELECT id, conversation_id, author_id, text, sent_at, updated_at
                 FROM messages
                 WHERE conversation_id = $1 AND sent_at < $2
                 ORDER BY sent_at DESC, id DESC
                 LIMIT $3",
            )
            .bind(conversation_id)
            .bind(datetime_to_db_text(cursor))
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, MessageRow>(
                "SELECT id, conversation_id, author_id, text, sent_at, updated_at
                 FROM messages
                 WHERE conversation_id = $1
                 ORDER BY sent_at DESC, id DESC
                 LIMIT $2",
            )
            .bind(conversation_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };
    rows.reverse();
    Ok(rows)
}

pub async fn update_message_text(
    pool: &DbPool,
    id: i64,
    text: &str,
) -> Result<MessageRow, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(
        "UPDATE messages SET text = $2, updated_at = $3
         WHERE id = $1
         RETURNING id, conversation_id, author_id, text, sent_at, updated_at",
    )
    .bind(id)
    .bind(text)
    .bind(datetime_to_db_text(Utc::now()))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn delete_message(pool: &DbPool, id: i64) -> Result<(), DbError> {
    sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub id: i64,
    pub participant_low: i64,
    pub participant_high: i64,
    pub last_message_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for ConversationRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let last_message_at_raw: String = row.try_get("last_message_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            participant_low: row.try_get("participant_low")?,
            participant_high: row.try_get("participant_high")?,
            last_message_at: datetime_from_db_text(&last_message_at_raw)?,
        })
    }
}

/// A conversation joined with the other participant's directory entry, for
/// the conversation list view.
#[derive(Debug, Clone)]
pub struct ConversationWithPeerRow {
    pub id: i64,
    pub last_message_at: DateTime<Utc>,
    pub peer_id: i64,
    pub peer_username: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for ConversationWithPeerRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let last_message_at_raw: String = row.try_get("last_message_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            last_message_at: datetime_from_db_text(&last_message_at_raw)?,
            peer_id: row.try_get("peer_id")?,
            peer_username: row.try_get("peer_username")?,
        })
    }
}

pub async fn get_conversation(
    pool: &DbPool,
    id: i64,
) -> Result<Option<ConversationRow>, DbError> {
    let row = sqlx::query_as::<_, ConversationRow>(
        "SELECT id, participant_low, participant_high, last_message_at
         FROM conversations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_pair(
    pool: &DbPool,
    participant_low: i64,
    participant_high: i64,
) -> Result<Option<ConversationRow>, DbError> {
    let row = sqlx::query_as::<_, ConversationRow>(
        "SELECT id, participant_low, participant_high, last_message_at
         FROM conversations
         WHERE participant_low = $1 AND participant_high = $2",
    )
    .bind(participant_low)
    .bind(participant_high)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a conversation for a canonical pair. A unique violation means a
/// concurrent first contact already created it; fetch and return that row
/// instead (benign race, resolved by the storage constraint).
pub async fn create_conversation(
    pool: &DbPool,
    id: i64,
    participant_low: i64,
    participant_high: i64,
) -> Result<ConversationRow, DbError> {
    let result = sqlx::query_as::<_, ConversationRow>(
        "INSERT INTO conversations (id, participant_low, participant_high, last_message_at)
         VALUES ($1, $2, $3, $4)
         RETURNING id, participant_low, participant_high, last_message_at",
    )
    .bind(id)
    .bind(participant_low)
    .bind(participant_high)
    .bind(datetime_to_db_text(Utc::now()))
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(err) if crate::is_unique_violation(&err) => {
            find_by_pair(pool, participant_low, participant_high)
                .await?
                .ok_or(DbError::Sqlx(err))
        }
        Err(err) => Err(DbError::Sqlx(err)),
    }
}

pub async fn list_for_user(
    pool: &DbPool,
    user_id: i64,
) -> Result<Vec<ConversationWithPeerRow>, DbError> {
    let rows = sqlx::query_as::<_, ConversationWithPeerRow>(
        "SELECT c.id, c.last_message_at,
                u.id AS peer_id,
                u.username AS peer_username
         FROM conversations c
         INNER JOIN users u
            ON u.id = CASE WHEN c.participant_low = $1
                           THEN c.participant_high
                           ELSE c.participant_low END
         WHERE c.participant_low = $1 OR c.participant_high = $1
         ORDER BY c.last_message_at DESC, c.id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_ids_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<i64>, DbError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT id FROM conversations
         WHERE participant_low = $1 OR participant_high = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn touch_last_message(
    pool: &DbPool,
    id: i64,
    at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
        .bind(id)
        .bind(datetime_to_db_text(at))
        .execute(pool)
        .await?;
    Ok(())
}

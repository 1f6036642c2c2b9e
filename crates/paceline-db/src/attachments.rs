use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct AttachmentRow {
    pub id: i64,
    pub owner_id: i64,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    pub url: String,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for AttachmentRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let created_at_raw: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            filename: row.try_get("filename")?,
            size: row.try_get("size")?,
            content_type: row.try_get("content_type")?,
            url: row.try_get("url")?,
            duration_seconds: row.try_get("duration_seconds")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
        })
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn create_attachment(
    pool: &DbPool,
    id: i64,
    owner_id: i64,
    filename: &str,
    size: i64,
    content_type: &str,
    url: &str,
    duration_seconds: Option<f64>,
) -> Result<AttachmentRow, DbError> {
    let row = sqlx::query_as::<_, AttachmentRow>(
        "INSERT INTO attachments
             (id, owner_id, filename, size, content_type, url, duration_seconds, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id, owner_id, filename, size, content_type, url,
                   duration_seconds, created_at",
    )
    .bind(id)
    .bind(owner_id)
    .bind(filename)
    .bind(size)
    .bind(content_type)
    .bind(url)
    .bind(duration_seconds)
    .bind(datetime_to_db_text(Utc::now()))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_attachment(pool: &DbPool, id: i64) -> Result<Option<AttachmentRow>, DbError> {
    let row = sqlx::query_as::<_, AttachmentRow>(
        "SELECT id, owner_id, filename, size, content_type, url,
                duration_seconds, created_at
         FROM attachments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_attachment(pool: &DbPool, id: i64) -> Result<(), DbError> {
    sqlx::query("DELETE FROM attachments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DbPool {
        let pool = crate::create_pool("sqlite::memory:", 1).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_and_get_attachment() {
        let pool = test_pool().await;
        let att = create_attachment(
            &pool,
            1,
            42,
            "ride.gpx",
            2048,
            "application/gpx+xml",
            "/api/v1/attachments/1",
            None,
        )
        .await
        .unwrap();
        assert_eq!(att.filename, "ride.gpx");
        assert_eq!(att.size, 2048);
        assert!(att.duration_seconds.is_none());

        let fetched = get_attachment(&pool, 1).await.unwrap().unwrap();
        assert_eq!(fetched.owner_id, 42);
    }

    #[tokio::test]
    async fn test_voice_note_keeps_duration() {
        let pool = test_pool().await;
        let att = create_attachment(
            &pool,
            2,
            42,
            "note.ogg",
            9000,
            "audio/ogg",
            "/api/v1/attachments/2",
            Some(12.5),
        )
        .await
        .unwrap();
        assert_eq!(att.duration_seconds, Some(12.5));
    }

    #[tokio::test]
    async fn test_delete_attachment() {
        let pool = test_pool().await;
        create_attachment(
            &pool,
            3,
            42,
            "x.png",
            10,
            "image/png",
            "/api/v1/attachments/3",
            None,
        )
        .await
        .unwrap();
        delete_attachment(&pool, 3).await.unwrap();
        assert!(get_attachment(&pool, 3).await.unwrap().is_none());
    }
}

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use paceline_core::AppState;
use paceline_media::StorageError;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{AuthUser, AuthUserRecord};
use crate::routes::conversations::parse_id;

fn attachment_json(att: &paceline_db::attachments::AttachmentRow) -> Value {
    json!({
        "id": att.id.to_string(),
        "owner_id": att.owner_id.to_string(),
        "filename": att.filename,
        "size": att.size,
        "content_type": att.content_type,
        "url": att.url,
        "duration_seconds": att.duration_seconds,
        "created_at": att.created_at,
    })
}

/// Multipart upload: a `file` part, plus an optional `duration_seconds` part
/// for voice notes. The blob goes to storage, the metadata to the database;
/// clients reference the attachment by url in message text.
pub async fn upload_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut filename: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;
    let mut duration_seconds: Option<f64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                filename = Some(field.file_name().unwrap_or("upload").to_string());
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::Validation(e.to_string()))?
                        .to_vec(),
                );
            }
            Some("duration_seconds") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                duration_seconds = Some(
                    raw.trim()
                        .parse()
                        .map_err(|_| ApiError::Validation("invalid duration".into()))?,
                );
            }
            _ => continue,
        }
    }

    let filename = filename.ok_or_else(|| ApiError::Validation("no file provided".into()))?;
    let data = data.ok_or_else(|| ApiError::Validation("no file provided".into()))?;
    if data.is_empty() {
        return Err(ApiError::Validation("empty file".into()));
    }

    let attachment_id = state.config.next_id();
    let stored = state
        .storage
        .store_file(attachment_id, auth.user_id, &filename, &data)
        .await
        .map_err(|err| match err {
            StorageError::TooLarge(got, limit) => {
                ApiError::Validation(format!("file too large: {got} bytes (limit {limit})"))
            }
            other => ApiError::Internal(anyhow::anyhow!(other.to_string())),
        })?;

    let attachment = paceline_db::attachments::create_attachment(
        &state.db,
        attachment_id,
        auth.user_id,
        &stored.filename,
        stored.size as i64,
        &stored.content_type,
        &stored.url,
        duration_seconds,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(attachment_json(&attachment))))
}

pub async fn download_attachment(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(attachment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let attachment_id = parse_id(&attachment_id)?;

    let attachment = paceline_db::attachments::get_attachment(&state.db, attachment_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let path = state
        .storage
        .file_path(attachment.id, attachment.owner_id)
        .await
        .map_err(|_| ApiError::NotFound)?;
    let data = tokio::fs::read(path).await.map_err(|_| ApiError::NotFound)?;

    let disposition = format!("inline; filename=\"{}\"", attachment.filename);
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_str(&attachment.content_type)
                    .unwrap_or(HeaderValue::from_static("application/octet-stream")),
            ),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&disposition)
                    .unwrap_or(HeaderValue::from_static("inline")),
            ),
        ],
        data,
    ))
}

/// Delete an attachment. Owner or admin only; everyone else gets the same
/// `NotFound` as for an attachment that never existed. The database row goes
/// first, then the blob, so a crash in between leaves only an orphaned file.
pub async fn delete_attachment(
    State(state): State<AppState>,
    auth: AuthUserRecord,
    Path(attachment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let attachment_id = parse_id(&attachment_id)?;

    let attachment = paceline_db::attachments::get_attachment(&state.db, attachment_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    if attachment.owner_id != auth.user.id && !paceline_core::is_admin(auth.user.flags) {
        return Err(ApiError::NotFound);
    }

    paceline_db::attachments::delete_attachment(&state.db, attachment_id).await?;
    if let Err(err) = state
        .storage
        .delete_file(attachment.id, attachment.owner_id)
        .await
    {
        tracing::warn!(attachment_id, "failed to delete attachment blob: {err}");
    }

    Ok(StatusCode::NO_CONTENT)
}

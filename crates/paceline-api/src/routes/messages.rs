use axum::{
    extract::{Path, State},
    Json,
};
use paceline_core::{message, AppState};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::AuthUserRecord;
use crate::routes::conversations::{broadcast_event, parse_id};

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub text: String,
}

pub async fn edit_message(
    State(state): State<AppState>,
    auth: AuthUserRecord,
    Path(message_id): Path<String>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let message_id = parse_id(&message_id)?;

    let event =
        message::edit_message(&state.db, message_id, auth.user.id, &body.text).await?;
    broadcast_event(&state, &event);

    Ok(Json(event.payload()))
}

pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUserRecord,
    Path(message_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let message_id = parse_id(&message_id)?;

    let event =
        message::remove_message(&state.db, message_id, auth.user.id, auth.user.flags).await?;
    broadcast_event(&state, &event);

    Ok(Json(event.payload()))
}

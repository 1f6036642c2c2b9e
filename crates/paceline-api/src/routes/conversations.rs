use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use paceline_core::{conversation, events::ChatEvent, message, unread, AppState};
use paceline_util::pagination::HistoryParams;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidId)
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let conversations = conversation::list_conversations(&state.db, auth.user_id).await?;

    let mut result = Vec::with_capacity(conversations.len());
    for conv in conversations {
        let unread =
            paceline_db::read_marks::count_unread(&state.db, conv.id, auth.user_id).await?;
        result.push(json!({
            "id": conv.id.to_string(),
            "last_message_at": conv.last_message_at,
            "unread": unread,
            "peer": {
                "id": conv.peer_id.to_string(),
                "username": conv.peer_username,
            },
        }));
    }

    Ok(Json(json!(result)))
}

/// Send a message to a peer. The conversation is resolved (created on first
/// contact) as part of the write, so clients never manage conversation ids
/// when sending.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(peer_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let peer_id = parse_id(&peer_id)?;

    // Reject bad text before resolve, so a failed send never creates the
    // conversation.
    paceline_util::validation::validate_message_text(&body.text)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let conv = conversation::resolve_conversation(
        &state.db,
        state.config.next_id(),
        auth.user_id,
        peer_id,
    )
    .await?;

    let event = message::append_message(
        &state.db,
        state.config.next_id(),
        conv.id,
        auth.user_id,
        &body.text,
    )
    .await?;

    state.rooms.broadcast(conv.id, &event.to_frame());

    let payload = event.payload();
    Ok((StatusCode::CREATED, Json(payload)))
}

/// Page of messages addressed by peer id: resolves (creating on first
/// contact) the conversation, then reads like `get_history`. Lets a client
/// open a chat view knowing only who it is talking to.
pub async fn get_peer_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(peer_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let peer_id = parse_id(&peer_id)?;

    let conv = conversation::resolve_conversation(
        &state.db,
        state.config.next_id(),
        auth.user_id,
        peer_id,
    )
    .await?;

    let messages = message::page_history(
        &state.db,
        conv.id,
        auth.user_id,
        params.before,
        params.limit(),
    )
    .await?;

    let messages: Vec<Value> = messages.iter().map(message::message_json).collect();
    Ok(Json(json!({
        "conversation_id": conv.id.to_string(),
        "messages": messages,
    })))
}

pub async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let conversation_id = parse_id(&conversation_id)?;

    let messages = message::page_history(
        &state.db,
        conversation_id,
        auth.user_id,
        params.before,
        params.limit(),
    )
    .await?;

    let items: Vec<Value> = messages.iter().map(message::message_json).collect();
    Ok(Json(json!({ "items": items })))
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkReadRequest {
    /// Watermark to advance to; omitted means now.
    pub at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<String>,
    body: Option<Json<MarkReadRequest>>,
) -> Result<Json<Value>, ApiError> {
    let conversation_id = parse_id(&conversation_id)?;
    let at = body
        .and_then(|Json(b)| b.at)
        .unwrap_or_else(chrono::Utc::now);

    unread::mark_read(&state.db, conversation_id, auth.user_id, Some(at)).await?;
    Ok(Json(json!({ "ok": true, "last_read_at": at })))
}

pub async fn get_unread(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let summary = unread::unread_summary(&state.db, auth.user_id).await?;

    let per_conversation: serde_json::Map<String, Value> = summary
        .conversations
        .iter()
        .map(|c| (c.conversation_id.to_string(), json!(c.unread)))
        .collect();

    Ok(Json(json!({
        "total": summary.total,
        "per_conversation": per_conversation,
    })))
}

// Re-exported for the messages routes, which broadcast the same way.
pub(crate) fn broadcast_event(state: &AppState, event: &ChatEvent) {
    state.rooms.broadcast(event.conversation_id(), &event.to_frame());
}

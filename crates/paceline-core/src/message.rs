use crate::conversation;
use crate::error::CoreError;
use crate::events::ChatEvent;
use crate::is_admin;
use chrono::{DateTime, Utc};
use paceline_db::messages::MessageRow;
use paceline_db::DbPool;
use paceline_models::message::Message;
use paceline_util::validation::validate_message_text;

/// JSON shape shared by HTTP responses and realtime frames. Ids go out as
/// strings so clients never hit precision loss on 64-bit values.
pub fn message_json(msg: &Message) -> serde_json::Value {
    serde_json::json!({
        "id": msg.id.to_string(),
        "conversation_id": msg.conversation_id.to_string(),
        "author_id": msg.author_id.to_string(),
        "text": msg.text,
        "sent_at": msg.sent_at,
        "updated_at": msg.updated_at,
    })
}

pub fn to_model(row: MessageRow) -> Message {
    Message {
        id: row.id,
        conversation_id: row.conversation_id,
        author_id: row.author_id,
        text: row.text,
        sent_at: row.sent_at,
        updated_at: row.updated_at,
    }
}

/// Append a message to a conversation the author participates in. Returns
/// the event the caller is expected to hand to the room broker.
pub async fn append_message(
    pool: &DbPool,
    msg_id: i64,
    conversation_id: i64,
    author_id: i64,
    text: &str,
) -> Result<ChatEvent, CoreError> {
    let trimmed = validate_message_text(text)?;
    conversation::require_participant(pool, conversation_id, author_id).await?;

    let row =
        paceline_db::messages::create_message(pool, msg_id, conversation_id, author_id, trimmed)
            .await?;
    Ok(ChatEvent::MessageCreated(to_model(row)))
}

/// One page of history, oldest-first, for a participant.
pub async fn page_history(
    pool: &DbPool,
    conversation_id: i64,
    user_id: i64,
    before: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<Message>, CoreError> {
    conversation::require_participant(pool, conversation_id, user_id).await?;
    let rows = paceline_db::messages::page_messages(pool, conversation_id, before, limit).await?;
    Ok(rows.into_iter().map(to_model).collect())
}

/// Edit a message's text. Only the author may edit; anyone else gets
/// `NotFound`, the same answer as for a message that does not exist.
pub async fn edit_message(
    pool: &DbPool,
    message_id: i64,
    user_id: i64,
    text: &str,
) -> Result<ChatEvent, CoreError> {
    let trimmed = validate_message_text(text)?;

    let msg = paceline_db::messages::get_message(pool, message_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if msg.author_id != user_id {
        return Err(CoreError::NotFound);
    }

    let updated = paceline_db::messages::update_message_text(pool, message_id, trimmed).await?;
    Ok(ChatEvent::MessageUpdated(to_model(updated)))
}

/// Delete a message. The author may always delete their own; an admin may
/// delete any. Everyone else gets `NotFound`.
pub async fn remove_message(
    pool: &DbPool,
    message_id: i64,
    user_id: i64,
    user_flags: i32,
) -> Result<ChatEvent, CoreError> {
    let msg = paceline_db::messages::get_message(pool, message_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if msg.author_id != user_id && !is_admin(user_flags) {
        return Err(CoreError::NotFound);
    }

    paceline_db::messages::delete_message(pool, message_id).await?;
    tracing::debug!(message_id, user_id, "message deleted");
    Ok(ChatEvent::MessageDeleted {
        conversation_id: msg.conversation_id,
        message_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::USER_FLAG_ADMIN;

    async fn test_pool() -> DbPool {
        let pool = paceline_db::create_pool("sqlite::memory:", 1).await.unwrap();
        paceline_db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn setup(pool: &DbPool) -> i64 {
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            paceline_db::users::create_user(
                pool,
                id,
                name,
                &format!("{name}@example.com"),
                "hash",
                0,
            )
            .await
            .unwrap();
        }
        conversation::resolve_conversation(pool, 100, 1, 2)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn append_produces_created_event() {
        let pool = test_pool().await;
        let conv = setup(&pool).await;
        let event = append_message(&pool, 1000, conv, 1, "  hello  ").await.unwrap();
        match event {
            ChatEvent::MessageCreated(msg) => {
                assert_eq!(msg.text, "hello");
                assert_eq!(msg.conversation_id, conv);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn append_rejects_blank_and_outsider() {
        let pool = test_pool().await;
        let conv = setup(&pool).await;
        assert!(matches!(
            append_message(&pool, 1000, conv, 1, "   ").await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            append_message(&pool, 1001, conv, 3, "hi").await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn history_hidden_from_non_participants() {
        let pool = test_pool().await;
        let conv = setup(&pool).await;
        append_message(&pool, 1000, conv, 1, "hi").await.unwrap();

        let page = page_history(&pool, conv, 2, None, 50).await.unwrap();
        assert_eq!(page.len(), 1);

        assert!(matches!(
            page_history(&pool, conv, 3, None, 50).await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn edit_is_author_only() {
        let pool = test_pool().await;
        let conv = setup(&pool).await;
        append_message(&pool, 1000, conv, 1, "draft").await.unwrap();

        let event = edit_message(&pool, 1000, 1, "final").await.unwrap();
        match event {
            ChatEvent::MessageUpdated(msg) => {
                assert_eq!(msg.text, "final");
                assert!(msg.updated_at.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // The peer gets the same answer as for a nonexistent message.
        assert!(matches!(
            edit_message(&pool, 1000, 2, "hijack").await,
            Err(CoreError::NotFound)
        ));
        assert!(matches!(
            edit_message(&pool, 9999, 1, "ghost").await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_allows_author_and_admin() {
        let pool = test_pool().await;
        let conv = setup(&pool).await;
        append_message(&pool, 1000, conv, 1, "one").await.unwrap();
        append_message(&pool, 1001, conv, 1, "two").await.unwrap();

        assert!(matches!(
            remove_message(&pool, 1000, 2, 0).await,
            Err(CoreError::NotFound)
        ));
        // The refused delete left the message in place.
        let survivor = paceline_db::messages::get_message(&pool, 1000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(survivor.text, "one");

        let by_author = remove_message(&pool, 1000, 1, 0).await.unwrap();
        assert!(matches!(by_author, ChatEvent::MessageDeleted { .. }));

        let by_admin = remove_message(&pool, 1001, 3, USER_FLAG_ADMIN).await.unwrap();
        match by_admin {
            ChatEvent::MessageDeleted {
                conversation_id,
                message_id,
            } => {
                assert_eq!(conversation_id, conv);
                assert_eq!(message_id, 1001);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

use crate::conversation;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use paceline_db::DbPool;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ConversationUnread {
    pub conversation_id: i64,
    pub unread: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadSummary {
    pub total: i64,
    pub conversations: Vec<ConversationUnread>,
}

/// Advance the caller's read watermark for a conversation. `at` defaults to
/// now; the watermark never moves backwards.
pub async fn mark_read(
    pool: &DbPool,
    conversation_id: i64,
    user_id: i64,
    at: Option<DateTime<Utc>>,
) -> Result<(), CoreError> {
    conversation::require_participant(pool, conversation_id, user_id).await?;
    let at = at.unwrap_or_else(Utc::now);
    paceline_db::read_marks::upsert_mark(pool, conversation_id, user_id, at).await?;
    Ok(())
}

/// Per-conversation unread counts across everything the user participates
/// in. Every conversation gets an entry, zero included, so clients can clear
/// a badge without diffing against the conversation list.
pub async fn unread_summary(pool: &DbPool, user_id: i64) -> Result<UnreadSummary, CoreError> {
    let conversation_ids = paceline_db::conversations::list_ids_for_user(pool, user_id).await?;

    let mut conversations = Vec::new();
    let mut total = 0;
    for conversation_id in conversation_ids {
        let unread = paceline_db::read_marks::count_unread(pool, conversation_id, user_id).await?;
        total += unread;
        conversations.push(ConversationUnread {
            conversation_id,
            unread,
        });
    }

    Ok(UnreadSummary {
        total,
        conversations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::append_message;

    async fn test_pool() -> DbPool {
        let pool = paceline_db::create_pool("sqlite::memory:", 1).await.unwrap();
        paceline_db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn setup(pool: &DbPool) -> (i64, i64) {
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
        let ab = conversation::resolve_conversation(pool, 100, 1, 2)
            .await
            .unwrap()
            .id;
        let ac = conversation::resolve_conversation(pool, 101, 1, 3)
            .await
            .unwrap()
            .id;
        (ab, ac)
    }

    #[tokio::test]
    async fn summary_counts_per_conversation_and_total() {
        let pool = test_pool().await;
        let (ab, ac) = setup(&pool).await;

        append_message(&pool, 1000, ab, 2, "one").await.unwrap();
        append_message(&pool, 1001, ab, 2, "two").await.unwrap();
        append_message(&pool, 1002, ac, 3, "three").await.unwrap();
        // Alice's own messages never count against her.
        append_message(&pool, 1003, ab, 1, "reply").await.unwrap();

        let summary = unread_summary(&pool, 1).await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.conversations.len(), 2);
        let for_ab = summary
            .conversations
            .iter()
            .find(|c| c.conversation_id == ab)
            .unwrap();
        assert_eq!(for_ab.unread, 2);
    }

    #[tokio::test]
    async fn mark_read_zeroes_but_keeps_the_entry() {
        let pool = test_pool().await;
        let (ab, ac) = setup(&pool).await;

        append_message(&pool, 1000, ab, 2, "hi").await.unwrap();
        assert_eq!(unread_summary(&pool, 1).await.unwrap().total, 1);

        mark_read(&pool, ab, 1, None).await.unwrap();
        let summary = unread_summary(&pool, 1).await.unwrap();
        assert_eq!(summary.total, 0);
        // A cleared conversation still reports an explicit zero.
        assert_eq!(summary.conversations.len(), 2);
        for conv_id in [ab, ac] {
            let entry = summary
                .conversations
                .iter()
                .find(|c| c.conversation_id == conv_id)
                .unwrap();
            assert_eq!(entry.unread, 0);
        }
    }

    #[tokio::test]
    async fn mark_read_requires_participation() {
        let pool = test_pool().await;
        let (ab, _) = setup(&pool).await;
        assert!(matches!(
            mark_read(&pool, ab, 3, None).await,
            Err(CoreError::NotFound)
        ));
    }
}

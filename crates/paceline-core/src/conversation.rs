use crate::error::CoreError;
use paceline_db::conversations::{ConversationRow, ConversationWithPeerRow};
use paceline_db::DbPool;
use paceline_models::conversation::Conversation;

/// Canonical participant ordering: a conversation between two users is the
/// same row no matter which of them reached out first.
pub fn canonical_pair(a: i64, b: i64) -> Result<(i64, i64), CoreError> {
    if a == b {
        return Err(CoreError::Validation(
            "cannot start a conversation with yourself".into(),
        ));
    }
    Ok((a.min(b), b.max(a)))
}

fn to_model(row: ConversationRow) -> Conversation {
    Conversation {
        id: row.id,
        participant_low: row.participant_low,
        participant_high: row.participant_high,
        last_message_at: row.last_message_at,
    }
}

/// Get-or-create the conversation between `user_id` and `peer_id`.
/// `candidate_id` is only used when a new row has to be inserted; when the
/// pair already exists (or a concurrent create wins the race) the stored row
/// is returned and the candidate is discarded.
pub async fn resolve_conversation(
    pool: &DbPool,
    candidate_id: i64,
    user_id: i64,
    peer_id: i64,
) -> Result<Conversation, CoreError> {
    let (low, high) = canonical_pair(user_id, peer_id)?;

    paceline_db::users::get_user_by_id(pool, peer_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    if let Some(existing) = paceline_db::conversations::find_by_pair(pool, low, high).await? {
        return Ok(to_model(existing));
    }

    let created = paceline_db::conversations::create_conversation(pool, candidate_id, low, high)
        .await?;
    if created.id == candidate_id {
        tracing::debug!(conversation_id = created.id, low, high, "conversation created");
    }
    Ok(to_model(created))
}

/// Fetch a conversation the caller participates in. Both a missing row and a
/// row the caller is not part of come back as `NotFound`.
pub async fn require_participant(
    pool: &DbPool,
    conversation_id: i64,
    user_id: i64,
) -> Result<Conversation, CoreError> {
    let conv = paceline_db::conversations::get_conversation(pool, conversation_id)
        .await?
        .map(to_model)
        .ok_or(CoreError::NotFound)?;
    if !conv.has_participant(user_id) {
        return Err(CoreError::NotFound);
    }
    Ok(conv)
}

pub async fn list_conversations(
    pool: &DbPool,
    user_id: i64,
) -> Result<Vec<ConversationWithPeerRow>, CoreError> {
    Ok(paceline_db::conversations::list_for_user(pool, user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DbPool {
        let pool = paceline_db::create_pool("sqlite::memory:", 1).await.unwrap();
        paceline_db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn seed_users(pool: &DbPool) {
        for (id, name) in [(1, "alice"), (2, "bob")] {
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
    }

    #[test]
    fn canonical_pair_is_order_independent() {
        assert_eq!(canonical_pair(7, 3).unwrap(), (3, 7));
        assert_eq!(canonical_pair(3, 7).unwrap(), (3, 7));
    }

    #[test]
    fn self_conversation_rejected() {
        assert!(matches!(
            canonical_pair(5, 5),
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn resolve_is_idempotent_across_directions() {
        let pool = test_pool().await;
        seed_users(&pool).await;

        let first = resolve_conversation(&pool, 100, 1, 2).await.unwrap();
        let second = resolve_conversation(&pool, 101, 2, 1).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.participant_low, 1);
        assert_eq!(first.participant_high, 2);
    }

    #[tokio::test]
    async fn resolve_unknown_peer_is_not_found() {
        let pool = test_pool().await;
        seed_users(&pool).await;
        assert!(matches!(
            resolve_conversation(&pool, 100, 1, 999).await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn non_participant_cannot_see_conversation() {
        let pool = test_pool().await;
        seed_users(&pool).await;
        paceline_db::users::create_user(&pool, 3, "carol", "carol@example.com", "hash", 0)
            .await
            .unwrap();
        let conv = resolve_conversation(&pool, 100, 1, 2).await.unwrap();

        assert!(require_participant(&pool, conv.id, 1).await.is_ok());
        assert!(matches!(
            require_participant(&pool, conv.id, 3).await,
            Err(CoreError::NotFound)
        ));
        assert!(matches!(
            require_participant(&pool, 555, 1).await,
            Err(CoreError::NotFound)
        ));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The durable 1:1 context owning an ordered message log between exactly
/// two users. `participant_low < participant_high` (canonical pair ordering)
/// so there is at most one conversation per unordered pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub participant_low: i64,
    pub participant_high: i64,
    pub last_message_at: DateTime<Utc>,
}

impl Conversation {
    /// The other participant, as seen from `user_id`.
    pub fn peer_of(&self, user_id: i64) -> i64 {
        if self.participant_low == user_id {
            self.participant_high
        } else {
            self.participant_low
        }
    }

    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participant_low == user_id || self.participant_high == user_id
    }
}

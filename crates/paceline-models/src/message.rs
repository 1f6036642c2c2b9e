use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub author_id: i64,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

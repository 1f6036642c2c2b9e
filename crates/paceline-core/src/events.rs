use paceline_models::message::Message;
use paceline_models::realtime::{
    EVENT_MESSAGE, EVENT_MESSAGE_DELETED, EVENT_MESSAGE_MODIFIED, EVENT_SYSTEM,
};
use serde_json::json;

/// A domain event produced by a message mutation. The HTTP and realtime
/// layers both consume these, so a mutation done over either surface reaches
/// connected clients the same way.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    MessageCreated(Message),
    MessageUpdated(Message),
    MessageDeleted {
        conversation_id: i64,
        message_id: i64,
    },
}

impl ChatEvent {
    pub fn conversation_id(&self) -> i64 {
        match self {
            Self::MessageCreated(msg) | Self::MessageUpdated(msg) => msg.conversation_id,
            Self::MessageDeleted {
                conversation_id, ..
            } => *conversation_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageCreated(_) => EVENT_MESSAGE,
            Self::MessageUpdated(_) => EVENT_MESSAGE_MODIFIED,
            Self::MessageDeleted { .. } => EVENT_MESSAGE_DELETED,
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::MessageCreated(msg) | Self::MessageUpdated(msg) => {
                crate::message::message_json(msg)
            }
            Self::MessageDeleted {
                conversation_id,
                message_id,
            } => json!({
                "conversation_id": conversation_id.to_string(),
                "id": message_id.to_string(),
            }),
        }
    }

    /// The wire frame broadcast to room subscribers.
    pub fn to_frame(&self) -> String {
        json!({
            "type": self.event_type(),
            "data": self.payload(),
        })
        .to_string()
    }
}

/// One-off frame sent to a single connection (command errors and the like).
pub fn system_frame(text: &str) -> String {
    json!({
        "type": EVENT_SYSTEM,
        "data": { "message": text },
    })
    .to_string()
}

/// Join acknowledgement, addressed to the joining connection only.
pub fn join_frame(conversation_id: i64) -> String {
    json!({
        "type": EVENT_SYSTEM,
        "data": {
            "message": "joined conversation",
            "conversation_id": conversation_id.to_string(),
        },
    })
    .to_string()
}

use serde::Deserialize;

// Server -> client event names
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_MESSAGE_MODIFIED: &str = "message-modified";
pub const EVENT_MESSAGE_DELETED: &str = "message-deleted";
pub const EVENT_SYSTEM: &str = "system";

/// A client -> server command on the realtime channel, decoded once at the
/// boundary. Ids arrive as strings (matching the HTTP surface) and are parsed
/// here so downstream code only ever sees typed commands.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatCommand {
    /// Switch the connection's active room to the conversation with `peer_id`.
    Join { peer_id: String },
    /// Send `text` to the conversation with `peer_id`, independent of which
    /// room the connection is currently subscribed to.
    Message { peer_id: String, text: String },
}

impl ChatCommand {
    /// Decode a raw text frame. Malformed input is an expected occurrence on
    /// an untrusted channel, so this returns `None` rather than an error; the
    /// caller logs and ignores it.
    pub fn decode(raw: &str) -> Option<ChatCommand> {
        serde_json::from_str(raw).ok()
    }

    pub fn peer_id(&self) -> Option<i64> {
        let raw = match self {
            ChatCommand::Join { peer_id } => peer_id,
            ChatCommand::Message { peer_id, .. } => peer_id,
        };
        raw.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_join() {
        let cmd = ChatCommand::decode(r#"{"type":"join","peer_id":"42"}"#).unwrap();
        assert_eq!(
            cmd,
            ChatCommand::Join {
                peer_id: "42".into()
            }
        );
        assert_eq!(cmd.peer_id(), Some(42));
    }

    #[test]
    fn decodes_message() {
        let cmd =
            ChatCommand::decode(r#"{"type":"message","peer_id":"7","text":"hello"}"#).unwrap();
        assert_eq!(
            cmd,
            ChatCommand::Message {
                peer_id: "7".into(),
                text: "hello".into()
            }
        );
    }

    #[test]
    fn malformed_frames_decode_to_none() {
        assert!(ChatCommand::decode("not json").is_none());
        assert!(ChatCommand::decode(r#"{"type":"unknown"}"#).is_none());
        assert!(ChatCommand::decode(r#"{"type":"join"}"#).is_none());
        assert!(ChatCommand::decode(r#"{"peer_id":"1"}"#).is_none());
    }

    #[test]
    fn non_numeric_peer_id_parses_to_none() {
        let cmd = ChatCommand::decode(r#"{"type":"join","peer_id":"abc"}"#).unwrap();
        assert_eq!(cmd.peer_id(), None);
    }
}

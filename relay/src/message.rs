use serde::{Deserialize, Serialize};

pub type ConnectionId = u16;
pub type SessionId = String;

/// One inbound wire message. Everything beyond the `type` discriminator
/// (and `sessionID` for joins) is opaque to the relay; drawing payloads
/// are forwarded from the original text, never re-serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "sessionID")]
        session_id: SessionId,
    },
    Drawing,
}

impl ClientMessage {
    /// Parses a raw text frame. Unparsable input and unrecognized `type`
    /// values yield `None`; the caller drops the frame and keeps the
    /// connection open.
    pub fn parse(raw: &str) -> Option<ClientMessage> {
        serde_json::from_str(raw).ok()
    }
}

//! JSON message types for the named-mode wire protocol.
//!
//! Every frame is one JSON object whose `"type"` field selects the variant;
//! the remaining fields sit alongside it in the same object:
//!
//! ```json
//! {"type":"setUsername","username":"alice"}
//! {"type":"privateMessage","to":"bob","message":"hi"}
//! {"type":"getUserList"}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` attribute produces exactly this shape.
//! Client → server and server → client use two distinct enums so a server-only
//! frame can never be parsed as a command.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::ChatError;

/// Discriminants the router understands.
const KNOWN_TYPES: [&str; 3] = ["setUsername", "privateMessage", "getUserList"];

// ── Client → Server ───────────────────────────────────────────────────────────

/// Commands a client can send in named mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    /// Claim (or switch to) a username.
    SetUsername { username: String },

    /// Send `message` to the user currently named `to`.
    PrivateMessage { to: String, message: String },

    /// Ask for the names of everyone currently online.
    GetUserList,
}

impl InboundMessage {
    /// Decodes one inbound text frame.
    ///
    /// Decoding happens in two steps so that a well-formed frame with an
    /// unrecognised `type` can be told apart from garbage.
    ///
    /// # Errors
    ///
    /// - [`ChatError::MalformedInput`] if the frame is not a JSON object, has
    ///   no string `type`, or a known type is missing a required field.
    /// - [`ChatError::UnknownType`] if `type` is a string naming no command.
    pub fn decode(frame: &str) -> Result<Self, ChatError> {
        let value: Value =
            serde_json::from_str(frame).map_err(|e| ChatError::MalformedInput(e.to_string()))?;

        let message_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ChatError::MalformedInput("missing string `type` field".into()))?;

        if !KNOWN_TYPES.contains(&message_type) {
            return Err(ChatError::UnknownType(message_type.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ChatError::MalformedInput(e.to_string()))
    }

    /// Short variant name for log lines; never includes message bodies.
    pub fn type_name(&self) -> &'static str {
        match self {
            InboundMessage::SetUsername { .. } => "setUsername",
            InboundMessage::PrivateMessage { .. } => "privateMessage",
            InboundMessage::GetUserList => "getUserList",
        }
    }
}

// ── Server → Client ───────────────────────────────────────────────────────────

/// Frames the server sends in named mode.
///
/// ```json
/// {"type":"system","message":"Username set to: alice","timestamp":"09:15:02"}
/// {"type":"privateMessage","from":"alice","to":"bob","message":"hi","timestamp":"09:15:07","isSent":false}
/// {"type":"userList","users":["alice","bob"]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Informational notice from the server.
    System { message: String, timestamp: String },

    /// The sender's last command failed.
    Error { message: String, timestamp: String },

    /// One half of a delivered private message.
    ///
    /// The recipient gets `is_sent == false`; the sender gets an echo with
    /// `is_sent == true`.  Both halves carry the same timestamp.
    PrivateMessage {
        from: String,
        to: String,
        message: String,
        timestamp: String,
        #[serde(rename = "isSent")]
        is_sent: bool,
    },

    /// Everyone currently holding a username, sorted.
    UserList { users: Vec<String> },
}

impl OutboundMessage {
    pub fn system(message: impl Into<String>, timestamp: impl Into<String>) -> Self {
        OutboundMessage::System {
            message: message.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn error(message: impl Into<String>, timestamp: impl Into<String>) -> Self {
        OutboundMessage::Error {
            message: message.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Serializes the frame to JSON text.
    ///
    /// serde_json escapes quotes, backslashes and control characters, so
    /// user-supplied text cannot break the frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

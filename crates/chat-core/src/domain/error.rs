//! Error taxonomy for frame handling.
//!
//! Every failure is scoped to the one connection that caused it.  None of
//! them close the connection and none of them are fatal to the process; the
//! router turns each into at most one `error` frame for the sender.
//!
//! | Kind                | Client sees                              |
//! |---------------------|------------------------------------------|
//! | `MalformedInput`    | `Invalid message format`                 |
//! | `ValidationFailure` | the specific reason (see [`ChatError`])  |
//! | `ProtocolViolation` | `Unknown message type`                   |
//! | `TransportFailure`  | nothing; the frame is dropped and logged |

use thiserror::Error;

use crate::domain::ids::ConnectionId;

/// Coarse classification of a [`ChatError`] or [`SendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    ValidationFailure,
    TransportFailure,
    ProtocolViolation,
}

/// Why a single outbound frame could not be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The peer is gone or the connection was closed locally.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// The per-connection outbound queue is full; the frame was dropped.
    #[error("outbound queue for connection {0} is full")]
    QueueFull(ConnectionId),
}

impl SendError {
    /// Always [`ErrorKind::TransportFailure`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::TransportFailure
    }
}

/// Errors produced while handling one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The frame is not JSON, not an object, or lacks a required field.
    #[error("invalid message format: {0}")]
    MalformedInput(String),

    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("username already taken")]
    UsernameTaken,

    /// The sender tried to act before binding a username.
    #[error("sender has no username")]
    NotNamed,

    #[error("user {0} not found")]
    UserNotFound(String),

    /// The `type` discriminant is a string, but not a known command.
    #[error("unknown message type {0:?}")]
    UnknownType(String),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::MalformedInput(_) => ErrorKind::MalformedInput,
            ChatError::EmptyUsername
            | ChatError::UsernameTaken
            | ChatError::NotNamed
            | ChatError::UserNotFound(_) => ErrorKind::ValidationFailure,
            ChatError::UnknownType(_) => ErrorKind::ProtocolViolation,
        }
    }

    /// The text placed in the `error` frame sent back to the offending
    /// connection.
    pub fn reply_text(&self) -> String {
        match self {
            ChatError::MalformedInput(_) => "Invalid message format".to_string(),
            ChatError::EmptyUsername => "Username cannot be empty".to_string(),
            ChatError::UsernameTaken => "Username already taken".to_string(),
            ChatError::NotNamed => "Please set your username first".to_string(),
            ChatError::UserNotFound(name) => format!("User {name} not found"),
            ChatError::UnknownType(_) => "Unknown message type".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_texts_match_protocol_strings() {
        assert_eq!(
            ChatError::MalformedInput("eof".into()).reply_text(),
            "Invalid message format"
        );
        assert_eq!(
            ChatError::EmptyUsername.reply_text(),
            "Username cannot be empty"
        );
        assert_eq!(
            ChatError::UsernameTaken.reply_text(),
            "Username already taken"
        );
        assert_eq!(
            ChatError::NotNamed.reply_text(),
            "Please set your username first"
        );
        assert_eq!(
            ChatError::UserNotFound("carol".into()).reply_text(),
            "User carol not found"
        );
        assert_eq!(
            ChatError::UnknownType("dance".into()).reply_text(),
            "Unknown message type"
        );
    }

    #[test]
    fn test_send_errors_are_transport_failures() {
        assert_eq!(
            SendError::Closed(ConnectionId(3)).kind(),
            ErrorKind::TransportFailure
        );
        assert_eq!(
            SendError::QueueFull(ConnectionId(3)).kind(),
            ErrorKind::TransportFailure
        );
    }

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(
            ChatError::MalformedInput(String::new()).kind(),
            ErrorKind::MalformedInput
        );
        assert_eq!(ChatError::NotNamed.kind(), ErrorKind::ValidationFailure);
        assert_eq!(
            ChatError::UserNotFound("x".into()).kind(),
            ErrorKind::ValidationFailure
        );
        assert_eq!(
            ChatError::UnknownType("x".into()).kind(),
            ErrorKind::ProtocolViolation
        );
    }
}

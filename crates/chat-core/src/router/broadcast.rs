//! BroadcastRouter: one shared room, no usernames.
//!
//! Every connection is joined the moment it connects.  Inbound frames are
//! not parsed; each one is relayed verbatim to everyone (the sender
//! included) as a plain UTF-8 line:
//!
//! ```text
//! User 3 joined the chat.
//! User 3: hello everyone
//! User 3 left the chat.
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info};

use crate::connection::{deliver, ConnectionRef};
use crate::domain::ids::ConnectionId;
use crate::domain::mode::ChatMode;
use crate::router::ChatRouter;

pub fn joined_line(id: ConnectionId) -> String {
    format!("User {id} joined the chat.")
}

pub fn chat_line(id: ConnectionId, text: &str) -> String {
    format!("User {id}: {text}")
}

pub fn left_line(id: ConnectionId) -> String {
    format!("User {id} left the chat.")
}

/// Router for the plain-text broadcast protocol.
#[derive(Default)]
pub struct BroadcastRouter {
    joined: RwLock<HashMap<ConnectionId, ConnectionRef>>,
}

impl BroadcastRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `line` to every joined connection.
    ///
    /// The member list is copied out first so no send happens under the lock.
    fn broadcast(&self, line: &str) {
        let members: Vec<ConnectionRef> = self
            .joined
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for conn in members {
            deliver(conn.as_ref(), line.to_string());
        }
    }
}

impl ChatRouter for BroadcastRouter {
    fn mode(&self) -> ChatMode {
        ChatMode::Broadcast
    }

    fn on_connect(&self, conn: &ConnectionRef) {
        let id = conn.id();
        self.joined
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, ConnectionRef::clone(conn));
        info!("connection {id} joined");
        self.broadcast(&joined_line(id));
    }

    fn on_frame(&self, conn: &ConnectionRef, frame: &str) {
        debug!("connection {}: {} bytes", conn.id(), frame.len());
        self.broadcast(&chat_line(conn.id(), frame));
    }

    fn on_disconnect(&self, conn: &ConnectionRef) {
        let id = conn.id();
        let removed = self
            .joined
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            info!("connection {id} left");
            self.broadcast(&left_line(id));
        }
    }
}

//! The seam between the core and the transport.
//!
//! The core never touches sockets.  The transport wraps each live client in
//! something implementing [`Connection`] and hands the core an
//! [`Arc`](std::sync::Arc) to it.  The core holds that reference only while
//! the connection is registered.
//!
//! Infrastructure implementations push frames onto a bounded per-connection
//! queue drained by a dedicated writer task; test implementations record the
//! frames they were given.

use std::sync::Arc;

use tracing::{debug, warn};

pub use crate::domain::error::SendError;
use crate::domain::ids::ConnectionId;

/// One live duplex channel to a client.
pub trait Connection: Send + Sync {
    /// Identifier assigned by the transport when the connection was accepted.
    fn id(&self) -> ConnectionId;

    /// `false` once the peer has gone away or [`close`](Self::close) ran.
    fn is_open(&self) -> bool;

    /// Queues one text frame for delivery.
    ///
    /// Must not block.  Frames queued on the same connection are delivered
    /// in the order they were queued.
    ///
    /// # Errors
    ///
    /// [`SendError::Closed`] if the connection is closed,
    /// [`SendError::QueueFull`] if the frame had to be dropped.
    fn send_text(&self, frame: String) -> Result<(), SendError>;

    /// Marks the connection closed and stops accepting frames.  Idempotent.
    fn close(&self);
}

/// Shared, non-owning handle the core keeps for a registered connection.
pub type ConnectionRef = Arc<dyn Connection>;

/// Best-effort delivery: hands `frame` to `conn` and swallows any failure.
///
/// Returns `true` if the transport accepted the frame.
pub(crate) fn deliver(conn: &dyn Connection, frame: String) -> bool {
    match conn.send_text(frame) {
        Ok(()) => true,
        Err(e @ SendError::QueueFull(_)) => {
            warn!(kind = ?e.kind(), "dropping frame: {e}");
            false
        }
        Err(e) => {
            debug!(kind = ?e.kind(), "dropping frame: {e}");
            false
        }
    }
}

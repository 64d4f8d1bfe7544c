//! WebSocket-backed [`Connection`].
//!
//! Routers call [`Connection::send_text`] from whatever task happens to be
//! handling a frame, often another client's.  A slow socket must not stall
//! that task, so `send_text` only pushes onto a bounded `mpsc` queue.  One
//! writer task per connection drains the queue into the WebSocket sink, which
//! also keeps frames to one client in order.
//!
//! ```text
//!  router (any task) ──try_send──► [bounded queue] ──► writer task ──► sink
//! ```
//!
//! When the queue is full the frame is dropped (`SendError::QueueFull`); when
//! the writer has failed or the session was closed, sends fail with
//! `SendError::Closed`.  Nothing is ever retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::debug;

use chat_core::{Connection, ConnectionId, SendError};

/// One accepted WebSocket client as seen by the chat core.
pub struct WsConnection {
    id: ConnectionId,
    open: Arc<AtomicBool>,
    outbound: mpsc::Sender<String>,
}

impl WsConnection {
    /// Creates the connection and the receiving end of its outbound queue.
    ///
    /// Pass the receiver to [`write_frames`] in a dedicated task.
    /// `capacity` must be at least 1.
    pub fn new(id: ConnectionId, capacity: usize) -> (Arc<Self>, OutboundQueue) {
        let (tx, rx) = mpsc::channel(capacity);
        let open = Arc::new(AtomicBool::new(true));
        let conn = Arc::new(Self {
            id,
            open: Arc::clone(&open),
            outbound: tx,
        });
        (conn, OutboundQueue { id, rx, open })
    }
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn send_text(&self, frame: String) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed(self.id));
        }
        match self.outbound.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SendError::QueueFull(self.id)),
            Err(TrySendError::Closed(_)) => {
                self.open.store(false, Ordering::Release);
                Err(SendError::Closed(self.id))
            }
        }
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

/// Receiving half of a connection's outbound queue.
pub struct OutboundQueue {
    id: ConnectionId,
    rx: mpsc::Receiver<String>,
    open: Arc<AtomicBool>,
}

/// Drains `queue` into `sink` until every sender is gone or a write fails.
///
/// Frames already queued when the session closes are still flushed.  On a
/// write failure the connection is marked closed so later sends fail fast.
/// A Close frame is sent once the queue is exhausted.
pub async fn write_frames<S>(mut sink: S, queue: OutboundQueue)
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let OutboundQueue { id, mut rx, open } = queue;

    while let Some(frame) = rx.recv().await {
        if let Err(e) = sink.send(WsMessage::Text(frame)).await {
            debug!("connection {id}: WebSocket send failed: {e}");
            open.store(false, Ordering::Release);
            return;
        }
    }

    // Best effort; the peer may already be gone.
    let _ = sink.close().await;
    debug!("connection {id}: writer finished");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

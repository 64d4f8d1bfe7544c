//! Session lifecycle: connect, frame dispatch, and exactly-once disconnect.
//!
//! The transport calls [`SessionManager::connect`] once per accepted
//! connection and gets back a [`Session`].  It then feeds every inbound text
//! frame to [`Session::handle_frame`] and calls [`Session::disconnect`] when
//! the peer goes away.
//!
//! # Exactly-once cleanup
//!
//! A dead socket is often reported twice (a read error and then a close
//! event, or a close frame and then end-of-stream).  `Session` carries an
//! atomic `closed` flag; only the caller that flips it from `false` to `true`
//! runs the router's disconnect logic.  Dropping a `Session` disconnects it
//! too, so a connection task that returns early or panics still cleans up.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::connection::ConnectionRef;
use crate::domain::clock::Clock;
use crate::domain::ids::ConnectionId;
use crate::domain::mode::ChatMode;
use crate::router::{self, ChatRouter};

/// Creates sessions and tracks how many are live.
///
/// Cheap to clone; clones share the same router and counter.
#[derive(Clone)]
pub struct SessionManager {
    router: Arc<dyn ChatRouter>,
    active: Arc<AtomicUsize>,
}

impl SessionManager {
    pub fn new(router: Arc<dyn ChatRouter>) -> Self {
        Self {
            router,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Builds a manager with a fresh router for `mode`.
    pub fn for_mode(mode: ChatMode, clock: Arc<dyn Clock>) -> Self {
        Self::new(router::for_mode(mode, clock))
    }

    pub fn mode(&self) -> ChatMode {
        self.router.mode()
    }

    /// Number of sessions connected and not yet disconnected.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Registers a freshly accepted connection.
    ///
    /// In named mode the connection starts Anonymous and receives the
    /// greeting; in broadcast mode it is joined and announced immediately.
    pub fn connect(&self, conn: ConnectionRef) -> Session {
        self.active.fetch_add(1, Ordering::SeqCst);
        info!("connection {} opened ({} mode)", conn.id(), self.mode());
        self.router.on_connect(&conn);
        Session {
            conn,
            router: Arc::clone(&self.router),
            active: Arc::clone(&self.active),
            closed: AtomicBool::new(false),
        }
    }
}

/// One connected client, from accept to disconnect.
pub struct Session {
    conn: ConnectionRef,
    router: Arc<dyn ChatRouter>,
    active: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl Session {
    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Routes one inbound text frame.  Ignored after disconnect.
    pub fn handle_frame(&self, frame: &str) {
        if self.is_closed() {
            debug!("connection {}: frame after disconnect ignored", self.id());
            return;
        }
        self.router.on_frame(&self.conn, frame);
    }

    /// Tears the session down.
    ///
    /// Returns `true` for the call that actually performed the cleanup and
    /// `false` for every redundant call after it.
    pub fn disconnect(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.conn.close();
        self.router.on_disconnect(&self.conn);
        self.active.fetch_sub(1, Ordering::SeqCst);
        info!("connection {} closed", self.id());
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

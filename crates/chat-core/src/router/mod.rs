//! Message routing.
//!
//! A [`ChatRouter`] decides what every connect, inbound frame, and disconnect
//! means and which connections hear about it.  Two implementations share the
//! same [`Connection`](crate::Connection) seam and lifecycle manager:
//!
//! - [`NamedRouter`] – JSON commands: set a username, send private messages,
//!   list who is online.
//! - [`BroadcastRouter`] – no commands; every text line goes to everyone,
//!   prefixed with the sender's connection id.
//!
//! Routers never block on a recipient: every send is a non-blocking enqueue
//! and failures are logged and dropped.

use std::sync::Arc;

use crate::connection::ConnectionRef;
use crate::domain::clock::Clock;
use crate::domain::mode::ChatMode;
use crate::registry::IdentityRegistry;

pub mod broadcast;
pub mod named;

pub use broadcast::BroadcastRouter;
pub use named::NamedRouter;

/// Protocol handler driven by the session lifecycle manager.
///
/// Implementations must be safe to call from many connection tasks at once.
pub trait ChatRouter: Send + Sync {
    fn mode(&self) -> ChatMode;

    /// A connection was accepted.  Runs before any frame from it.
    fn on_connect(&self, conn: &ConnectionRef);

    /// One inbound text frame from `conn`.
    fn on_frame(&self, conn: &ConnectionRef, frame: &str);

    /// `conn` went away.  Called exactly once per connection.
    fn on_disconnect(&self, conn: &ConnectionRef);
}

/// Builds the router for `mode`.
///
/// Named mode gets a fresh, empty [`IdentityRegistry`].
pub fn for_mode(mode: ChatMode, clock: Arc<dyn Clock>) -> Arc<dyn ChatRouter> {
    match mode {
        ChatMode::Named => Arc::new(NamedRouter::new(Arc::new(IdentityRegistry::new()), clock)),
        ChatMode::Broadcast => Arc::new(BroadcastRouter::new()),
    }
}

//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from defaults, an optional TOML file, and CLI
//! arguments, then shared read-only with every connection task.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chat_core::ChatMode;

/// Default WebSocket port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default depth of each connection's outbound frame queue.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// All runtime configuration for the chat server.
///
/// # Example
///
/// ```rust
/// use chat_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8080);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address and port the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Protocol spoken on every connection.
    pub mode: ChatMode,

    /// How many outbound frames may wait for one slow client before further
    /// frames to it are dropped.
    pub outbound_queue_capacity: usize,
}

impl Default for ServerConfig {
    /// | Field                   | Default        |
    /// |-------------------------|----------------|
    /// | bind_addr               | `0.0.0.0:8080` |
    /// | mode                    | `named`        |
    /// | outbound_queue_capacity | 64             |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            mode: ChatMode::Named,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! chat-server library crate.
//!
//! WebSocket front end for [`chat_core`].  It owns everything the core
//! deliberately leaves out: sockets, the upgrade handshake, per-connection
//! outbound queues, configuration, and process startup.
//!
//! # Architecture
//!
//! ```text
//! Browser (text frames over WebSocket)
//!         ↕
//! [chat-server]
//!   ├── domain/            ServerConfig
//!   └── infrastructure/
//!         ├── config_file    optional TOML config
//!         ├── ws_connection  Connection impl: bounded queue + writer task
//!         └── ws_server      accept loop, one task per connection
//!         ↕
//! [chat-core]  SessionManager → router → IdentityRegistry
//! ```

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Infrastructure layer: config file, WebSocket connection and server.
pub mod infrastructure;

//! Infrastructure layer for chat-server.
//!
//! Everything that touches the outside world lives here: the optional TOML
//! config file, the TCP listener, the WebSocket upgrade, and the per-connection
//! reader and writer tasks.

pub mod config_file;
pub mod ws_connection;
pub mod ws_server;

pub use config_file::{ConfigError, FileConfig};
pub use ws_connection::WsConnection;
pub use ws_server::{run_server, serve};

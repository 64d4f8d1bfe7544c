//! Domain layer for chat-server.
//!
//! Plain configuration types with no I/O.  Reading files and environment
//! variables is the job of the infrastructure layer and `main.rs`.

pub mod config;

pub use config::ServerConfig;

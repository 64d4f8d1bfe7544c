//! Chat server entry point.
//!
//! Accepts WebSocket connections and routes chat traffic between them using
//! one of two protocols:
//!
//! - `named` (default): JSON commands, usernames, private messages and a
//!   live user list.
//! - `broadcast`: every text frame is relayed to every connected client as
//!   `User <id>: <text>`.
//!
//! # Usage
//!
//! ```text
//! chat-server [OPTIONS]
//!
//! Options:
//!   --config         <PATH>   Optional TOML config file
//!   --bind           <IP>     Listener address [default: 0.0.0.0]
//!   --port           <PORT>   Listener port [default: 8080]
//!   --mode           <MODE>   named | broadcast [default: named]
//!   --queue-capacity <N>      Outbound frames buffered per client [default: 64]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Description                    |
//! |-----------------------|--------------------------------|
//! | `CHAT_CONFIG`         | Path of the TOML config file   |
//! | `CHAT_BIND`           | Listener address               |
//! | `CHAT_PORT`           | Listener port                  |
//! | `CHAT_MODE`           | `named` or `broadcast`         |
//! | `CHAT_QUEUE_CAPACITY` | Outbound frames per client     |
//!
//! Precedence: built-in defaults < config file < environment < CLI flags.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_core::ChatMode;
use chat_server::domain::ServerConfig;
use chat_server::infrastructure::{run_server, FileConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Real-time chat router over WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "chat-server",
    about = "WebSocket chat server with named private messaging or broadcast relay",
    version
)]
struct Cli {
    /// TOML file with any of `bind_address`, `port`, `mode`,
    /// `outbound_queue_capacity`.
    #[arg(long, env = "CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the listener to.
    #[arg(long, env = "CHAT_BIND")]
    bind: Option<String>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "CHAT_PORT")]
    port: Option<u16>,

    /// Protocol spoken on every connection: `named` or `broadcast`.
    #[arg(long, env = "CHAT_MODE")]
    mode: Option<ChatMode>,

    /// Outbound frames buffered per client before further frames are dropped.
    #[arg(long, env = "CHAT_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,
}

impl Cli {
    /// Resolves defaults, the optional config file and the CLI values into a
    /// [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, if the
    /// bind address is not an IP address, or if the queue capacity is 0.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let from_file = match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => FileConfig::default(),
        };

        let from_cli = FileConfig {
            bind_address: self.bind,
            port: self.port,
            mode: self.mode,
            outbound_queue_capacity: self.queue_capacity,
        };

        from_file
            .overlay(from_cli)
            .apply_to(ServerConfig::default())
            .context("invalid server configuration")
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG wins; otherwise `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_server_config()?;

    info!(
        "chat server starting: bind={}, mode={}, queue={}",
        config.bind_addr, config.mode, config.outbound_queue_capacity
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    // The accept loop polls `running` every 200 ms.
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("chat server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! WebSocket server: accept loop and per-connection task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections and upgrading each to WebSocket.
//! 3. Giving each connection an id, a [`WsConnection`], and a writer task.
//! 4. Feeding inbound text frames to the connection's [`Session`].
//! 5. Disconnecting the session exactly once when the client goes away.
//! 6. Stopping the accept loop when the `running` flag is cleared.
//!
//! # Scalability
//!
//! Each connection runs in its own Tokio task and owns one writer task.  The
//! only state shared between connections is the chat core's registry, and
//! no task ever waits on another client's socket.
//!
//! [`Session`]: chat_core::Session

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use chat_core::{Connection, ConnectionIdAllocator, ConnectionRef, SessionManager, SystemClock};

use crate::domain::config::ServerConfig;
use crate::infrastructure::ws_connection::{write_frames, WsConnection};

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long a closing connection's writer may keep flushing queued frames.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(config: ServerConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    let manager = SessionManager::for_mode(config.mode, Arc::new(SystemClock));
    serve(listener, config, manager, running).await
}

/// Runs the accept loop on an already-bound `listener`.
///
/// Each accepted connection is handed off to a dedicated Tokio task so that
/// one slow client never blocks others.
///
/// # Errors
///
/// Currently always returns `Ok`; transient accept errors are logged and the
/// loop keeps going.
pub async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    manager: SessionManager,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr().ok();
    info!(
        "chat server listening on {} ({} mode)",
        local_addr.map_or_else(|| config.bind_addr.to_string(), |a| a.to_string()),
        manager.mode()
    );

    let config = Arc::new(config);
    let ids = Arc::new(ConnectionIdAllocator::new());

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short timeout lets the loop notice the shutdown flag even when
        // nobody is connecting.
        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                let manager = manager.clone();
                let ids = Arc::clone(&ids);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, cfg, manager, ids).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout: loop back to check the `running` flag.
            }
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Wraps [`run_connection`] and logs the outcome.
async fn handle_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    manager: SessionManager,
    ids: Arc<ConnectionIdAllocator>,
) {
    match run_connection(raw_stream, peer_addr, config, manager, ids).await {
        Ok(()) => debug!("connection from {peer_addr} finished"),
        Err(e) => warn!("connection from {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs one client from WebSocket handshake to disconnect.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails.  Errors after the
/// handshake end the session but are not reported as failures.
async fn run_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    manager: SessionManager,
    ids: Arc<ConnectionIdAllocator>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let id = ids.next();
    info!("connection {id} established from {peer_addr}");

    let (ws_tx, mut ws_rx) = ws_stream.split();
    let (conn, queue) = WsConnection::new(id, config.outbound_queue_capacity);
    let mut writer = tokio::spawn(write_frames(ws_tx, queue));

    let session = manager.connect(Arc::clone(&conn) as ConnectionRef);

    loop {
        let ws_msg = match ws_rx.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!("connection {id}: WebSocket closed");
                break;
            }
            Some(Err(e)) => {
                warn!("connection {id}: WebSocket error: {e}");
                break;
            }
            None => {
                debug!("connection {id}: stream ended");
                break;
            }
        };

        match ws_msg {
            WsMessage::Text(text) => session.handle_frame(&text),
            WsMessage::Binary(_) => {
                // The chat protocol is text-only.
                warn!("connection {id}: unexpected binary WebSocket frame (ignored)");
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => {
                // tokio-tungstenite answers pings itself.
            }
            WsMessage::Close(_) => {
                debug!("connection {id}: Close frame received");
                break;
            }
            WsMessage::Frame(_) => {
                debug!("connection {id}: raw frame (ignored)");
            }
        }

        if !conn.is_open() {
            debug!("connection {id}: writer failed; ending session");
            break;
        }
    }

    session.disconnect();
    drop(session);
    drop(conn);

    // The writer exits once the queue is drained and every handle to the
    // connection is gone; give it a moment to flush, then stop it.
    if timeout(WRITER_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        debug!("connection {id}: writer did not finish in time; aborting");
        writer.abort();
    }

    Ok(())
}

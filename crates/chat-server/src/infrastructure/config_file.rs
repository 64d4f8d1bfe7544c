//! Optional TOML configuration file.
//!
//! Every field is optional.  A missing field keeps whatever value the
//! [`ServerConfig`] already has, so a file only needs to list what it
//! changes:
//!
//! ```toml
//! bind_address = "127.0.0.1"
//! port = 9000
//! mode = "broadcast"
//! outbound_queue_capacity = 128
//! ```
//!
//! Precedence at startup is defaults < file < CLI / environment.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use chat_core::ChatMode;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::ServerConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    /// A queue of zero frames could never deliver anything.
    #[error("outbound_queue_capacity must be at least 1")]
    ZeroQueueCapacity,
}

/// Settings as written in the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub mode: Option<ChatMode>,
    #[serde(default)]
    pub outbound_queue_capacity: Option<usize>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read (including when
    /// it does not exist: an explicitly named file is required) and
    /// [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Layers `other` on top of `self`: fields set in `other` win.
    pub fn overlay(self, other: FileConfig) -> FileConfig {
        FileConfig {
            bind_address: other.bind_address.or(self.bind_address),
            port: other.port.or(self.port),
            mode: other.mode.or(self.mode),
            outbound_queue_capacity: other.outbound_queue_capacity.or(self.outbound_queue_capacity),
        }
    }

    /// Applies the fields that are set onto `base`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBindAddress`] if `bind_address` is not an IP
    /// address; [`ConfigError::ZeroQueueCapacity`] for a capacity of 0.
    pub fn apply_to(self, base: ServerConfig) -> Result<ServerConfig, ConfigError> {
        let ip = match self.bind_address {
            Some(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidBindAddress(raw))?,
            None => base.bind_addr.ip(),
        };
        let port = self.port.unwrap_or(base.bind_addr.port());

        let outbound_queue_capacity = self
            .outbound_queue_capacity
            .unwrap_or(base.outbound_queue_capacity);
        if outbound_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(ip, port),
            mode: self.mode.unwrap_or(base.mode),
            outbound_queue_capacity,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

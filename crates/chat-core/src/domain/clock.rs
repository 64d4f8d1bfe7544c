//! Wall-clock timestamps for outbound frames.
//!
//! Every `system`, `error`, and private-message frame carries a
//! `"HH:MM:SS"` timestamp.  The router asks a [`Clock`] for it so tests can
//! pin the value.

use chrono::Local;

/// Format used for every outbound `timestamp` field.
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Source of `HH:MM:SS` timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time formatted as `HH:MM:SS` (24-hour).
    fn timestamp(&self) -> String;
}

/// [`Clock`] backed by the local system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn timestamp(&self) -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

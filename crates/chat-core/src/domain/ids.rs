//! Connection identifiers and the allocator that hands them out.
//!
//! The transport assigns every accepted connection a [`ConnectionId`] before
//! the core ever sees it.  Ids are small integers so they read naturally in
//! broadcast-mode lines (`User 7: hello`).
//!
//! # Thread safety
//!
//! [`ConnectionIdAllocator`] uses an `AtomicU64`.  `fetch_add` reads,
//! increments, and writes the counter as one indivisible step, so concurrent
//! accept loops never hand out the same id twice.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier of one live connection, unique for the process lifetime
/// (until the counter wraps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A thread-safe, monotonically increasing source of [`ConnectionId`]s.
///
/// Ids start at 0 and increment by 1 with each call to [`next`](Self::next).
/// The counter wraps around at `u64::MAX` back to 0 without panicking.
///
/// # Examples
///
/// ```rust
/// use chat_core::domain::ConnectionIdAllocator;
///
/// let ids = ConnectionIdAllocator::new();
/// assert_eq!(ids.next().0, 0);
/// assert_eq!(ids.next().0, 1);
/// ```
#[derive(Debug)]
pub struct ConnectionIdAllocator {
    inner: AtomicU64,
}

impl ConnectionIdAllocator {
    /// Creates a new allocator starting at 0.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Returns the next id and atomically advances the counter.
    ///
    /// `Ordering::Relaxed` is enough: the id only has to be unique, it does
    /// not publish any other memory to the thread that receives it.
    pub fn next(&self) -> ConnectionId {
        ConnectionId(self.inner.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

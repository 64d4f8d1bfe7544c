//! IdentityRegistry: the username ↔ connection map.
//!
//! The registry owns both directions of the mapping:
//!
//! ```text
//! by_name: Username     → ConnectionRef
//! by_conn: ConnectionId → Username
//! ```
//!
//! Both maps live inside one `RwLock`, so every mutation updates the pair in
//! a single critical section.  A reader therefore never sees a half-applied
//! update: no name without a connection, no connection with two names.
//!
//! Critical sections are a handful of hash-map operations.  Nothing is ever
//! sent to a connection while the lock is held.
//!
//! # Lifecycle
//!
//! Created empty with [`IdentityRegistry::new`], shared through an `Arc`, and
//! dropped with the router.  It holds no external resources.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::connection::ConnectionRef;
use crate::domain::ids::ConnectionId;
use crate::domain::username::Username;

/// Error type for registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another open connection already holds the name.
    #[error("username '{0}' is already taken")]
    AlreadyTaken(Username),
}

/// Outcome of a successful [`IdentityRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The connection was anonymous and now holds the name.
    Registered,
    /// The connection switched from `previous` to the new name.
    Renamed { previous: Username },
    /// The connection already held exactly this name.
    Unchanged,
}

#[derive(Default)]
struct Entries {
    by_name: HashMap<Username, ConnectionRef>,
    by_conn: HashMap<ConnectionId, Username>,
}

impl Entries {
    fn unlink(&mut self, id: ConnectionId) -> Option<Username> {
        let name = self.by_conn.remove(&id)?;
        self.by_name.remove(&name);
        Some(name)
    }
}

/// Concurrent bidirectional mapping between usernames and connections.
#[derive(Default)]
pub struct IdentityRegistry {
    entries: RwLock<Entries>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the maps torn: every
    // mutation below finishes its map updates before anything can unwind.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `username` to `conn`.
    ///
    /// The uniqueness check and the insert happen under one write lock, so of
    /// two connections racing for the same name exactly one wins.
    ///
    /// - If `conn` already holds another name, that name is released in the
    ///   same critical section (see [`rebind`](Self::rebind)).
    /// - If the name is held by a connection that reports closed, the stale
    ///   entry is evicted and the name is handed over.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyTaken`] if a different, still-open connection
    /// holds `username`.  The registry is unchanged in that case.
    pub fn register(
        &self,
        username: Username,
        conn: &ConnectionRef,
    ) -> Result<Registration, RegistryError> {
        let id = conn.id();
        let mut entries = self.write();

        if let Some(holder) = entries.by_name.get(&username) {
            let holder_id = holder.id();
            if holder_id == id {
                return Ok(Registration::Unchanged);
            }
            if holder.is_open() {
                return Err(RegistryError::AlreadyTaken(username));
            }
            entries.unlink(holder_id);
        }

        let previous = entries.by_conn.insert(id, username.clone());
        if let Some(previous) = &previous {
            entries.by_name.remove(previous);
        }
        entries.by_name.insert(username, Arc::clone(conn));

        Ok(match previous {
            Some(previous) => Registration::Renamed { previous },
            None => Registration::Registered,
        })
    }

    /// Switches `conn` to `new_username`, releasing any name it held.
    ///
    /// The swap is atomic with respect to every other registry call: readers
    /// see either the old binding or the new one, never both and never
    /// neither.  Same contract and errors as [`register`](Self::register).
    pub fn rebind(
        &self,
        conn: &ConnectionRef,
        new_username: Username,
    ) -> Result<Registration, RegistryError> {
        self.register(new_username, conn)
    }

    /// Returns the connection currently holding `username`.
    pub fn lookup(&self, username: &str) -> Option<ConnectionRef> {
        self.read().by_name.get(username).cloned()
    }

    /// Returns the name held by connection `id`, or `None` if it is anonymous.
    pub fn username_of(&self, id: ConnectionId) -> Option<Username> {
        self.read().by_conn.get(&id).cloned()
    }

    /// Drops both entries for connection `id` and returns the freed name.
    ///
    /// Removing an unregistered connection is a no-op.
    pub fn remove(&self, id: ConnectionId) -> Option<Username> {
        self.write().unlink(id)
    }

    /// Snapshot of every registered name, sorted.
    pub fn all_usernames(&self) -> BTreeSet<Username> {
        self.read().by_name.keys().cloned().collect()
    }

    /// Snapshot of every connection that currently holds a name.
    pub fn named_connections(&self) -> Vec<ConnectionRef> {
        self.read().by_name.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().by_conn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! The running set: sockets kept alive by an outstanding native operation.
//!
//! A socket enters the set when a listen or connect succeeds and leaves it
//! when it stops, when its connect fails, or when the context drains the
//! set during teardown. Membership goes hand in hand with the socket
//! proxy holding a strong reference to its script peer.

use indexmap::IndexSet;
use netbind_pool::SlotKey;

/// Insertion-ordered set of running socket proxy keys.
#[derive(Debug, Default)]
pub struct RunningSet {
    entries: IndexSet<SlotKey>,
}

impl RunningSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a socket. Returns `false` if it was already registered.
    pub fn register(&mut self, key: SlotKey) -> bool {
        self.entries.insert(key)
    }

    /// Remove a socket. Returns `false` if it was not registered.
    pub fn unregister(&mut self, key: SlotKey) -> bool {
        self.entries.shift_remove(&key)
    }

    /// Whether a socket is registered.
    pub fn contains(&self, key: SlotKey) -> bool {
        self.entries.contains(&key)
    }

    /// Number of registered sockets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no sockets are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys in registration order.
    pub fn iter(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.entries.iter().copied()
    }

    /// Remove and return every entry, oldest first.
    pub fn drain(&mut self) -> Vec<SlotKey> {
        self.entries.drain(..).collect()
    }
}

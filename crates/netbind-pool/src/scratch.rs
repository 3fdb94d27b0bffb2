//! Shared scratch space for transient encode/decode work.
//!
//! [`ScratchArena`] is one growable byte buffer. Callers check it out
//! with [`ScratchArena::acquire`], which hands back a [`ScratchGuard`]
//! sized to the request; the buffer becomes available again when the
//! guard drops. A second `acquire` while a guard is alive fails with
//! [`ScratchError::Busy`] rather than handing out an aliasing view.
//!
//! The backing allocation is reused across acquisitions and only grows.

use crate::error::ScratchError;
use std::cell::{RefCell, RefMut};
use std::ops::{Deref, DerefMut};

/// A single shared byte buffer with dynamic exclusivity.
#[derive(Debug, Default)]
pub struct ScratchArena {
    /// Backing storage. Grows on demand, shrinks only on `release_memory`.
    data: RefCell<Vec<u8>>,
}

impl ScratchArena {
    /// Create an arena with `initial_bytes` of zeroed storage.
    pub fn new(initial_bytes: usize) -> Result<Self, ScratchError> {
        let mut data = Vec::new();
        data.try_reserve_exact(initial_bytes)
            .map_err(|_| ScratchError::AllocationFailed {
                requested: initial_bytes,
            })?;
        data.resize(initial_bytes, 0);
        Ok(Self {
            data: RefCell::new(data),
        })
    }

    /// Check out `len` zeroed bytes.
    ///
    /// Fails with [`ScratchError::Busy`] while another guard is alive, and
    /// with [`ScratchError::AllocationFailed`] if the buffer cannot grow.
    /// A failed acquire leaves the current holder's contents untouched.
    pub fn acquire(&self, len: usize) -> Result<ScratchGuard<'_>, ScratchError> {
        let mut data = self.data.try_borrow_mut().map_err(|_| ScratchError::Busy)?;
        if len > data.len() {
            let additional = len - data.len();
            data.try_reserve(additional)
                .map_err(|_| ScratchError::AllocationFailed { requested: len })?;
            data.resize(len, 0);
        }
        data[..len].fill(0);
        Ok(ScratchGuard { data, len })
    }

    /// Whether a guard is currently checked out.
    pub fn is_busy(&self) -> bool {
        self.data.try_borrow_mut().is_err()
    }

    /// Size of the backing storage in bytes (0 while checked out).
    pub fn capacity(&self) -> usize {
        self.data.try_borrow().map(|d| d.len()).unwrap_or(0)
    }

    /// Drop the backing storage. Used on context teardown.
    pub fn release_memory(&mut self) {
        *self.data.get_mut() = Vec::new();
    }
}

/// A checked-out view of the [`ScratchArena`].
///
/// Dereferences to exactly the requested number of bytes. Dropping the
/// guard returns the arena.
#[derive(Debug)]
pub struct ScratchGuard<'a> {
    data: RefMut<'a, Vec<u8>>,
    len: usize,
}

impl Deref for ScratchGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl DerefMut for ScratchGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }
}

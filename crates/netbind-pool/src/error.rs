//! Pool and scratch error types.

use thiserror::Error;

/// Errors that can occur when acquiring from a [`SlotPool`](crate::SlotPool).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool already has its maximum number of elements in use.
    #[error("{pool} pool exhausted: {capacity} elements in use")]
    Exhausted {
        /// Pool name.
        pool: &'static str,
        /// Configured maximum.
        capacity: usize,
    },
    /// Growing the backing storage failed.
    #[error("{pool} pool allocation failed")]
    AllocationFailed {
        /// Pool name.
        pool: &'static str,
    },
}

/// Errors that can occur when acquiring the [`ScratchArena`](crate::ScratchArena).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScratchError {
    /// The arena is already checked out.
    #[error("scratch arena is busy")]
    Busy,
    /// Growing the buffer to the requested length failed.
    #[error("scratch arena allocation of {requested} bytes failed")]
    AllocationFailed {
        /// Number of bytes requested.
        requested: usize,
    },
}

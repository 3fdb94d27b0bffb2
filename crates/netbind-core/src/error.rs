//! Error types reported by the two collaborators.

use crate::id::NativeEntity;
use std::fmt;
use thiserror::Error;

/// Errors returned by a [`NativeEngine`](crate::NativeEngine).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NativeError {
    /// The entity does not exist (never created, or already destroyed).
    #[error("unknown native {0}")]
    UnknownEntity(NativeEntity),
    /// The engine refused the operation in its current state.
    #[error("native operation refused: {reason}")]
    Refused {
        /// Human-readable reason.
        reason: String,
    },
    /// A read ran past the end of the message payload.
    #[error("message underflow")]
    Underflow,
    /// A write ran past the message capacity.
    #[error("message overflow")]
    Overflow,
    /// A channel index was out of range for the session or socket.
    #[error("channel index {index} out of range")]
    InvalidChannel {
        /// The requested index.
        index: usize,
    },
    /// The engine could not allocate the entity.
    #[error("native allocation failed")]
    AllocationFailed,
}

/// Category of a script-visible error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptErrorKind {
    /// A generic `Error`.
    Error,
    /// A `TypeError`.
    TypeError,
    /// A `RangeError`.
    RangeError,
    /// An internal engine error (out of memory and similar).
    InternalError,
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptErrorKind::Error => f.write_str("Error"),
            ScriptErrorKind::TypeError => f.write_str("TypeError"),
            ScriptErrorKind::RangeError => f.write_str("RangeError"),
            ScriptErrorKind::InternalError => f.write_str("InternalError"),
        }
    }
}

/// An error thrown into, or raised by, the script runtime.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ScriptError {
    /// Error class.
    pub kind: ScriptErrorKind,
    /// Error message.
    pub message: String,
}

impl ScriptError {
    /// Build an error of the given kind.
    pub fn new(kind: ScriptErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::TypeError, message)
    }

    /// Shorthand for a generic `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ScriptErrorKind::Error, message)
    }
}

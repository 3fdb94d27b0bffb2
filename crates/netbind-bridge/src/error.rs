//! Bridge error types and their script-visible form.

use crate::config::ConfigError;
use netbind_core::{EntityKind, NativeError, ScriptError, ScriptErrorKind};
use netbind_pool::{PoolError, ScratchError};
use thiserror::Error;

/// Errors raised by bridge operations.
///
/// Synchronous operations return these directly; the embedding throws
/// the [`ScriptError`] built from them. Listen and connect failures are
/// delivered as rejected promises instead.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A pool has its maximum number of elements in use.
    #[error("{pool} pool exhausted")]
    PoolExhausted {
        /// Which pool.
        pool: &'static str,
    },
    /// The object is not a live peer of the expected kind.
    #[error("invalid {kind} handle")]
    InvalidHandle {
        /// Expected kind.
        kind: EntityKind,
    },
    /// The native engine reported a failure.
    #[error("{operation} failed: {source}")]
    NativeOperationFailed {
        /// The operation that failed.
        operation: &'static str,
        /// The engine's error.
        #[source]
        source: NativeError,
    },
    /// Growing some bridge storage failed.
    #[error("{what} allocation failed")]
    AllocationFailed {
        /// What was being allocated.
        what: &'static str,
    },
    /// An argument failed validation.
    #[error("{0}")]
    InvalidArgument(&'static str),
    /// A length or count argument is outside its allowed range.
    #[error("{0}")]
    OutOfRange(&'static str),
    /// The scratch arena is already checked out.
    #[error("scratch arena is busy")]
    ScratchBusy,
    /// The script host failed.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl BridgeError {
    pub(crate) fn native(operation: &'static str) -> impl FnOnce(NativeError) -> Self {
        move |source| BridgeError::NativeOperationFailed { operation, source }
    }
}

impl From<PoolError> for BridgeError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Exhausted { pool, .. } => BridgeError::PoolExhausted { pool },
            PoolError::AllocationFailed { pool } => BridgeError::AllocationFailed { what: pool },
        }
    }
}

impl From<ScratchError> for BridgeError {
    fn from(e: ScratchError) -> Self {
        match e {
            ScratchError::Busy => BridgeError::ScratchBusy,
            ScratchError::AllocationFailed { .. } => BridgeError::AllocationFailed {
                what: "scratch",
            },
        }
    }
}

impl From<&BridgeError> for ScriptError {
    fn from(e: &BridgeError) -> Self {
        match e {
            BridgeError::PoolExhausted { pool } => {
                ScriptError::type_error(format!("Failed to acquire {pool}"))
            }
            BridgeError::InvalidHandle { kind } => ScriptError::type_error(format!(
                "Invalid native {}",
                kind.class_name().to_ascii_lowercase()
            )),
            BridgeError::NativeOperationFailed { operation, source } => match source {
                NativeError::Underflow => ScriptError::type_error("Message is underflow"),
                NativeError::Overflow => ScriptError::type_error("Message is overflow"),
                _ => ScriptError::type_error(format!("Failed to {operation}")),
            },
            BridgeError::AllocationFailed { .. } => {
                ScriptError::new(ScriptErrorKind::InternalError, "out of memory")
            }
            BridgeError::InvalidArgument(message) => ScriptError::type_error(*message),
            BridgeError::OutOfRange(message) => {
                ScriptError::new(ScriptErrorKind::RangeError, *message)
            }
            BridgeError::ScratchBusy => ScriptError::error("Scratch buffer is busy"),
            BridgeError::Script(inner) => inner.clone(),
        }
    }
}

impl From<BridgeError> for ScriptError {
    fn from(e: BridgeError) -> Self {
        ScriptError::from(&e)
    }
}

/// Errors raised while building a [`Context`](crate::Context).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A pool could not be created.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The scratch arena could not be created.
    #[error(transparent)]
    Scratch(#[from] ScratchError),
    /// The native engine refused the association.
    #[error("native engine attach failed: {0}")]
    Native(#[from] NativeError),
    /// The script host refused the association.
    #[error("script host attach failed: {0}")]
    Script(#[from] ScriptError),
}

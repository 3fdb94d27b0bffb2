//! Pool configuration parameters.

use thiserror::Error;

/// Configuration for one [`SlotPool`](crate::SlotPool).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PoolConfig {
    /// Maximum number of elements in use at once. `None` = unbounded.
    pub max_in_use: Option<usize>,

    /// Number of slots to reserve storage for at construction.
    ///
    /// Default: 0. Must not exceed `max_in_use` when a cap is set.
    pub preallocate: usize,
}

impl PoolConfig {
    /// An unbounded pool with no preallocation.
    pub const fn unbounded() -> Self {
        Self {
            max_in_use: None,
            preallocate: 0,
        }
    }

    /// A pool capped at `max_in_use` elements.
    pub const fn bounded(max_in_use: usize) -> Self {
        Self {
            max_in_use: Some(max_in_use),
            preallocate: 0,
        }
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<(), PoolConfigError> {
        if let Some(max) = self.max_in_use {
            if max == 0 {
                return Err(PoolConfigError::ZeroCapacity);
            }
            if self.preallocate > max {
                return Err(PoolConfigError::PreallocateExceedsCapacity {
                    preallocate: self.preallocate,
                    max_in_use: max,
                });
            }
        }
        Ok(())
    }
}

/// Errors detected by [`PoolConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolConfigError {
    /// `max_in_use` is `Some(0)`: nothing could ever be acquired.
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,
    /// More slots preallocated than could ever be used.
    #[error("preallocate ({preallocate}) exceeds max_in_use ({max_in_use})")]
    PreallocateExceedsCapacity {
        /// Requested preallocation.
        preallocate: usize,
        /// Configured cap.
        max_in_use: usize,
    },
}

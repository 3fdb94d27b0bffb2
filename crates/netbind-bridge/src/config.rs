//! Bridge configuration.

use netbind_pool::{PoolConfig, PoolConfigError};
use thiserror::Error;

/// Configuration of a [`Context`](crate::Context).
///
/// One [`PoolConfig`] per proxy kind plus the completion records, and
/// the initial size of the scratch arena. Validated once at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    // ── Pools ──────────────────────────────────────────────────
    /// Socket proxies.
    pub sockets: PoolConfig,
    /// Session proxies.
    pub sessions: PoolConfig,
    /// Channel proxies.
    pub channels: PoolConfig,
    /// Message proxies.
    pub messages: PoolConfig,
    /// In-flight send completion records.
    pub completions: PoolConfig,

    // ── Scratch ────────────────────────────────────────────────
    /// Initial scratch arena size in bytes. The arena grows on demand.
    pub scratch_bytes: usize,
}

impl BridgeConfig {
    /// Default initial scratch size, enough for a decoded connect token.
    pub const DEFAULT_SCRATCH_BYTES: usize = 4096;

    /// Check every pool configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pools = [
            ("socket", &self.sockets),
            ("session", &self.sessions),
            ("channel", &self.channels),
            ("message", &self.messages),
            ("send info", &self.completions),
        ];
        for (pool, config) in pools {
            config
                .validate()
                .map_err(|source| ConfigError::Pool { pool, source })?;
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sockets: PoolConfig::unbounded(),
            sessions: PoolConfig::unbounded(),
            channels: PoolConfig::unbounded(),
            messages: PoolConfig::unbounded(),
            completions: PoolConfig::unbounded(),
            scratch_bytes: Self::DEFAULT_SCRATCH_BYTES,
        }
    }
}

/// Errors detected by [`BridgeConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A pool configuration is invalid.
    #[error("{pool} pool: {source}")]
    Pool {
        /// Which pool.
        pool: &'static str,
        /// What is wrong with it.
        #[source]
        source: PoolConfigError,
    },
}

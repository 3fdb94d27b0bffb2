//! Generational slot pools and a shared scratch arena.
//!
//! # Architecture
//!
//! ```text
//! SlotPool<T>
//! ├── Slot[] (generation, occupied flag, recycled element)
//! ├── free list (LIFO reuse)
//! └── Poolable hooks: on_init once per slot, on_cleanup per release
//!
//! ScratchArena
//! └── one byte buffer behind a checked-out ScratchGuard
//! ```
//!
//! Every key handed out by a pool is a [`SlotKey`]: slot index in the
//! upper 32 bits, generation in the lower 32 bits. Releasing a slot bumps
//! its generation, so stale keys resolve to `None` instead of aliasing a
//! recycled element.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod key;
pub mod pool;
pub mod scratch;

pub use config::{PoolConfig, PoolConfigError};
pub use error::{PoolError, ScratchError};
pub use key::SlotKey;
pub use pool::{Poolable, SlotPool};
pub use scratch::{ScratchArena, ScratchGuard};

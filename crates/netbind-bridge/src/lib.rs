//! Lifecycle bridge between a script runtime and a native network engine.
//!
//! Every native socket, session, channel and message that a script can
//! see is paired with a proxy stored in a [`SlotPool`](netbind_pool::SlotPool).
//! The proxy key is written into the native entity's extra slot and into
//! the script object's opaque slot, so both sides reach the proxy through
//! a generation-tagged key and never through a raw pointer.
//!
//! # Ownership
//!
//! | Kind    | Who owns the native entity | Script reference held by the proxy |
//! |---------|----------------------------|------------------------------------|
//! | Socket  | the script object          | weak; strong while running         |
//! | Session | the native engine          | strong until native cleanup        |
//! | Channel | the native engine          | strong until native cleanup        |
//! | Message | shared (reference counted) | weak; one native reference held    |
//!
//! Each proxy moves through
//! `Unattached -> Attached -> {NativeDetached | ScriptFinalized} -> Released`.
//! Whichever side lets go first severs the link; the other side's later
//! teardown releases the proxy. Both orders release it exactly once.
//!
//! # Events
//!
//! The engine and the host post [`NativeEvent`](netbind_core::NativeEvent)s
//! and [`Finalization`](netbind_core::Finalization)s onto queues.
//! [`Context::pump`] drains both and dispatches them on the caller's
//! thread: listener callbacks, promise settlement and proxy teardown all
//! happen there.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod error;
pub mod link;
pub mod registry;
pub mod stats;

mod channel;
mod completion;
mod dispatch;
mod message;
mod proxy;
mod session;
mod socket;
mod token;

pub use config::{BridgeConfig, ConfigError};
pub use context::Context;
pub use error::{BridgeError, ContextError};
pub use link::{LinkState, Side, Transition};
pub use registry::RunningSet;
pub use socket::ConnectToken;
pub use stats::BindingStats;
pub use token::TokenRequest;

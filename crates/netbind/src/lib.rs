//! netbind: script bindings for a native networking engine.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all netbind sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use netbind::prelude::*;
//! use netbind_test_utils::{MockEngine, MockScriptHost};
//!
//! let engine = MockEngine::new();
//! let host = MockScriptHost::new();
//! let mut ctx = Context::new(engine.clone(), host.clone(), BridgeConfig::default()).unwrap();
//!
//! let socket = ctx.socket_new(&[ChannelMode::Reliable as i32]).unwrap();
//! let _listening = ctx
//!     .socket_listen(socket, &[0u8; KEY_BYTES], 1, 8, "127.0.0.1:9000")
//!     .unwrap();
//! assert_eq!(ctx.statistics().running, 1);
//!
//! ctx.shutdown();
//! assert!(engine.is_shut_down());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `netbind-core` | IDs, values, events, the engine and host traits |
//! | [`pool`] | `netbind-pool` | Generational slot pools and the scratch arena |
//! | [`bridge`] | `netbind-bridge` | Proxies, completions, running set, context |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, events and collaborator traits (`netbind-core`).
///
/// Implement [`types::NativeEngine`] for the transport and
/// [`types::ScriptHost`] for the script runtime.
pub use netbind_core as types;

/// Slot pools and scratch space (`netbind-pool`).
pub use netbind_pool as pool;

/// The binding context and its error types (`netbind-bridge`).
pub use netbind_bridge as bridge;

/// Common imports for typical netbind usage.
///
/// ```rust
/// use netbind::prelude::*;
/// ```
pub mod prelude {
    // Context
    pub use netbind_bridge::{BindingStats, BridgeConfig, ConnectToken, Context, TokenRequest};

    // Errors
    pub use netbind_bridge::{BridgeError, ConfigError, ContextError};
    pub use netbind_core::{NativeError, ScriptError, ScriptErrorKind};

    // Collaborators
    pub use netbind_core::{
        ConnectTokenParams, EventSink, FinalizerSink, NativeEngine, NativeEvent, ObjectRef,
        PluginSource, ScriptHost, Value,
    };

    // Script-visible enums and limits
    pub use netbind_core::{
        ChannelMode, ConnectResult, Rtt, SocketState, CONNECT_TOKEN_BYTES,
        CONNECT_TOKEN_MAX_ADDRESSES, CONNECT_TOKEN_NONCE_BYTES, KEY_BYTES, MAX_CHANNELS,
        USER_DATA_BYTES,
    };

    // Pools
    pub use netbind_pool::PoolConfig;
}

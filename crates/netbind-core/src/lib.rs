//! Core types and collaborator traits for netbind.
//!
//! This is the leaf crate in the netbind dependency graph. It defines the
//! identifiers exchanged with the native network engine and the script
//! host, the value and enum types that cross the script boundary, the
//! event types the native engine posts back, and the two traits the
//! bridge is written against:
//!
//! - [`NativeEngine`]: the transport engine (sockets, sessions,
//!   channels, messages). Entities are addressed by opaque ids and carry
//!   one "extra" slot the bridge uses for its back-pointer.
//! - [`ScriptHost`]: the garbage-collected script runtime. Objects are
//!   addressed by counted [`ObjectRef`]s and report collection through
//!   a [`FinalizerSink`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod id;
pub mod native;
pub mod script;
pub mod value;

pub use error::{NativeError, ScriptError, ScriptErrorKind};
pub use event::{
    event_channel, finalizer_channel, EventQueue, EventSink, Finalization, FinalizerQueue,
    FinalizerSink, NativeEvent,
};
pub use id::{
    ChannelId, CompletionToken, EntityKind, MessageId, NativeEntity, ObjectRef, SessionId,
    SocketId,
};
pub use native::{ConnectTokenParams, ListenParams, NativeEngine, PluginSource, SendTarget};
pub use script::ScriptHost;
pub use value::{
    ChannelMode, ConnectResult, PromiseCapability, Rtt, SocketState, Value, CONNECT_TOKEN_BYTES,
    CONNECT_TOKEN_MAX_ADDRESSES, CONNECT_TOKEN_NONCE_BYTES, KEY_BYTES, MAX_CHANNELS,
    USER_DATA_BYTES,
};

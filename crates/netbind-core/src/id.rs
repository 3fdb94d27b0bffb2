//! Strongly-typed identifiers for native entities and script objects.

use std::fmt;

macro_rules! native_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

native_id!(
    /// Identifies a socket owned by the native engine.
    SocketId
);
native_id!(
    /// Identifies a remote peer session owned by the native engine.
    ///
    /// Sessions are created by the engine when a peer connects and are
    /// destroyed by the engine when the peer disconnects or the socket
    /// stops.
    SessionId
);
native_id!(
    /// Identifies one channel of a session.
    ChannelId
);
native_id!(
    /// Identifies a reference-counted native message buffer.
    MessageId
);

/// A counted reference to an object living in the script heap.
///
/// Every `ObjectRef` handed across the [`ScriptHost`](crate::ScriptHost)
/// boundary represents one reference count. Whoever holds it must give it
/// back with [`ScriptHost::free`](crate::ScriptHost::free) or transfer it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(pub u64);

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Opaque correlation key passed with a native send and echoed back in
/// the matching [`NativeEvent::SendCompleted`](crate::NativeEvent::SendCompleted).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompletionToken(pub u64);

/// The four native entity kinds that have script-visible peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A listening or connecting socket.
    Socket,
    /// A connected remote peer.
    Session,
    /// One delivery channel of a session.
    Channel,
    /// A message buffer.
    Message,
}

impl EntityKind {
    /// Script-visible class name for this kind.
    pub fn class_name(self) -> &'static str {
        match self {
            EntityKind::Socket => "Socket",
            EntityKind::Session => "Session",
            EntityKind::Channel => "Channel",
            EntityKind::Message => "Message",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// A native entity of any kind.
///
/// Used where the engine addresses the shared "extra" slot or reports
/// destruction without caring about the concrete kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeEntity {
    /// A socket.
    Socket(SocketId),
    /// A session.
    Session(SessionId),
    /// A channel.
    Channel(ChannelId),
    /// A message.
    Message(MessageId),
}

impl NativeEntity {
    /// The kind of this entity.
    pub fn kind(self) -> EntityKind {
        match self {
            NativeEntity::Socket(_) => EntityKind::Socket,
            NativeEntity::Session(_) => EntityKind::Session,
            NativeEntity::Channel(_) => EntityKind::Channel,
            NativeEntity::Message(_) => EntityKind::Message,
        }
    }
}

impl fmt::Display for NativeEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeEntity::Socket(id) => write!(f, "socket {id}"),
            NativeEntity::Session(id) => write!(f, "session {id}"),
            NativeEntity::Channel(id) => write!(f, "channel {id}"),
            NativeEntity::Message(id) => write!(f, "message {id}"),
        }
    }
}

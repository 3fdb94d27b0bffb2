//! The native network engine as seen by the bridge.

use crate::error::NativeError;
use crate::event::EventSink;
use crate::id::{ChannelId, CompletionToken, MessageId, NativeEntity, SessionId, SocketId};
use crate::value::{ChannelMode, Rtt, SocketState};
use smallvec::SmallVec;

/// Parameters of a server `listen` call.
#[derive(Clone, Copy, Debug)]
pub struct ListenParams<'a> {
    /// Server private key, exactly [`KEY_BYTES`](crate::KEY_BYTES) long.
    pub private_key: &'a [u8],
    /// Protocol identifier shared with clients.
    pub protocol_id: u64,
    /// Maximum number of concurrently connected clients.
    pub max_clients: usize,
    /// Bind address.
    pub address: std::net::SocketAddr,
}

/// Fields of a connect token for the engine to seal.
///
/// Lengths are checked by the bridge before the engine sees them: keys
/// are [`KEY_BYTES`](crate::KEY_BYTES) long, the nonce is
/// [`CONNECT_TOKEN_NONCE_BYTES`](crate::CONNECT_TOKEN_NONCE_BYTES) long
/// and the user data is zero-padded to
/// [`USER_DATA_BYTES`](crate::USER_DATA_BYTES).
#[derive(Clone, Copy, Debug)]
pub struct ConnectTokenParams<'a> {
    /// Server private key used to seal the private part.
    pub private_key: &'a [u8],
    /// Protocol identifier shared with the server.
    pub protocol_id: u64,
    /// Creation time, seconds since the Unix epoch.
    pub create_timestamp: i64,
    /// Expiry time, seconds since the Unix epoch.
    pub expire_timestamp: i64,
    /// Nonce of the private part.
    pub nonce: &'a [u8],
    /// Connection timeout in seconds. Negative disables the timeout.
    pub timeout: i32,
    /// Servers the client may connect to, in preference order.
    pub addresses: &'a [std::net::SocketAddr],
    /// Key for client to server traffic.
    pub client_to_server_key: &'a [u8],
    /// Key for server to client traffic.
    pub server_to_client_key: &'a [u8],
    /// Identifier of the authenticated client.
    pub client_id: i64,
    /// Application data handed to the server on connect.
    pub user_data: &'a [u8],
}

/// Where a plugin is loaded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginSource<'a> {
    /// A plugin the engine can resolve by name.
    Name(&'a str),
    /// A plugin library on disk.
    Path(&'a std::path::Path),
}

/// Destination of a send.
#[derive(Clone, Copy, Debug)]
pub enum SendTarget<'a> {
    /// Send through a socket to a set of sessions.
    Socket {
        /// The sending socket.
        socket: SocketId,
        /// Channel index on every recipient.
        channel_index: usize,
        /// Recipients. May be empty.
        recipients: &'a [SessionId],
    },
    /// Send to one session on one of its channels.
    Session {
        /// The recipient.
        session: SessionId,
        /// Channel index.
        channel_index: usize,
    },
    /// Send on a specific channel.
    Channel(ChannelId),
}

/// The native network engine.
///
/// Every entity carries one "extra" slot the bridge uses to store the
/// key of its proxy. Writing the extra slot of an entity that no longer
/// exists is a no-op. An entity announced through
/// [`NativeEvent::Cleanup`](crate::NativeEvent::Cleanup) keeps its extra
/// slot readable until it is cleared.
///
/// Sends never fail synchronously: every call to [`send`](Self::send)
/// is answered by exactly one
/// [`NativeEvent::SendCompleted`](crate::NativeEvent::SendCompleted)
/// carrying the same token, with a zero count when nothing was delivered.
pub trait NativeEngine {
    /// Install the event sink. Called once when a context is created.
    fn attach(&mut self, sink: EventSink) -> Result<(), NativeError>;

    /// Release every engine resource. Called once when a context is
    /// torn down, after the bridge has let go of all entities.
    fn shutdown(&mut self);

    // ── Sockets ─────────────────────────────────────────────────

    /// Create a stopped socket with one channel per mode.
    fn create_socket(&mut self, modes: &[ChannelMode]) -> Result<SocketId, NativeError>;

    /// Destroy a socket, stopping it first if needed.
    fn destroy_socket(&mut self, socket: SocketId);

    /// Start listening as a server.
    fn listen(&mut self, socket: SocketId, params: &ListenParams<'_>) -> Result<(), NativeError>;

    /// Start connecting as a client. The outcome arrives as a
    /// [`NativeEvent::ConnectResult`](crate::NativeEvent::ConnectResult).
    fn connect(&mut self, socket: SocketId, token: &[u8]) -> Result<(), NativeError>;

    /// Stop a running socket, disconnecting every session.
    fn stop(&mut self, socket: SocketId);

    /// Current socket state.
    fn socket_state(&self, socket: SocketId) -> SocketState;

    /// Engine clock as seen by the socket, in nanoseconds.
    fn time(&self, socket: SocketId) -> Result<u64, NativeError>;

    /// Send a message. See the trait documentation for completion rules.
    fn send(&mut self, target: SendTarget<'_>, message: MessageId, token: CompletionToken);

    // ── Back-pointers ───────────────────────────────────────────

    /// Write the extra slot of an entity.
    fn set_extra(&mut self, entity: NativeEntity, extra: Option<u64>);

    /// Read the extra slot of an entity.
    fn extra(&self, entity: NativeEntity) -> Option<u64>;

    // ── Sessions and channels ───────────────────────────────────

    /// Client id of a session.
    fn session_client_id(&self, session: SessionId) -> Result<i64, NativeError>;

    /// Disconnect a session.
    fn session_disconnect(&mut self, session: SessionId) -> Result<(), NativeError>;

    /// Round-trip statistics of a session.
    fn session_rtt(&self, session: SessionId) -> Result<Rtt, NativeError>;

    /// The channels of a session, in index order.
    fn session_channels(
        &self,
        session: SessionId,
    ) -> Result<SmallVec<[ChannelId; 4]>, NativeError>;

    /// Delivery mode of a channel.
    fn channel_mode(&self, channel: ChannelId) -> Result<ChannelMode, NativeError>;

    /// Change the delivery mode of a channel.
    fn set_channel_mode(&mut self, channel: ChannelId, mode: ChannelMode)
        -> Result<(), NativeError>;

    // ── Tokens and plugins ──────────────────────────────────────

    /// Seal a connect token into `out`, which is exactly
    /// [`CONNECT_TOKEN_BYTES`](crate::CONNECT_TOKEN_BYTES) long.
    fn encode_connect_token(
        &mut self,
        params: &ConnectTokenParams<'_>,
        out: &mut [u8],
    ) -> Result<(), NativeError>;

    /// Fill `buf` with cryptographically random bytes.
    fn random_bytes(&mut self, buf: &mut [u8]);

    /// Load and register a plugin.
    fn register_plugin(&mut self, source: PluginSource<'_>) -> Result<(), NativeError>;

    // ── Messages ────────────────────────────────────────────────

    /// Acquire a fresh message holding one reference.
    fn acquire_message(&mut self) -> Result<MessageId, NativeError>;

    /// Add a reference to a message.
    fn ref_message(&mut self, message: MessageId) -> Result<(), NativeError>;

    /// Drop a reference. The message is recycled when the last one goes.
    fn unref_message(&mut self, message: MessageId);

    /// Payload size in bytes.
    fn message_size(&self, message: MessageId) -> Result<usize, NativeError>;

    /// Clear the payload and rewind the read cursor.
    fn message_reset(&mut self, message: MessageId) -> Result<(), NativeError>;

    /// Read exactly `buf.len()` bytes at the read cursor.
    fn message_read(&mut self, message: MessageId, buf: &mut [u8]) -> Result<(), NativeError>;

    /// Append bytes to the payload.
    fn message_write(&mut self, message: MessageId, bytes: &[u8]) -> Result<(), NativeError>;
}

//! Values and enums that cross the script boundary.

use crate::error::ScriptError;
use crate::id::ObjectRef;

/// Length of a server private key in bytes.
pub const KEY_BYTES: usize = 32;

/// Length of a decoded connect token in bytes.
pub const CONNECT_TOKEN_BYTES: usize = 2048;

/// Maximum number of channels a socket may be created with.
pub const MAX_CHANNELS: usize = 128;

/// Length of the nonce sealed into a connect token.
pub const CONNECT_TOKEN_NONCE_BYTES: usize = 24;

/// Maximum length of the user data carried by a connect token.
pub const USER_DATA_BYTES: usize = 256;

/// Maximum number of server addresses in a connect token.
pub const CONNECT_TOKEN_MAX_ADDRESSES: usize = 32;

/// A script value as seen by the bridge.
///
/// `Object` values are counted references: a `Value` returned from the
/// [`ScriptHost`](crate::ScriptHost) is owned by the caller, a `Value`
/// passed as a call argument is borrowed for the duration of the call.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 32-bit signed integer.
    Int(i32),
    /// A double.
    Float(f64),
    /// A signed 64-bit big integer.
    BigInt(i64),
    /// An unsigned 64-bit big integer.
    BigUint(u64),
    /// A byte array (materialised as a `Uint8Array` by the host).
    Bytes(Vec<u8>),
    /// An error to be materialised as a script error object.
    Error(ScriptError),
    /// A heap object.
    Object(ObjectRef),
}

impl Value {
    /// The object reference, if this value is an object.
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(obj) => Some(*obj),
            _ => None,
        }
    }

    /// Whether this value is `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }
}

/// Delivery mode of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ChannelMode {
    /// Fire and forget.
    #[default]
    Unreliable = 0,
    /// Unreliable, but stale messages are dropped.
    Sequenced = 1,
    /// Retransmitted until acknowledged.
    Reliable = 2,
}

impl TryFrom<i32> for ChannelMode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChannelMode::Unreliable),
            1 => Ok(ChannelMode::Sequenced),
            2 => Ok(ChannelMode::Reliable),
            other => Err(other),
        }
    }
}

impl From<ChannelMode> for i32 {
    fn from(mode: ChannelMode) -> Self {
        mode as i32
    }
}

/// Outcome of a client connect attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ConnectResult {
    /// The server accepted the connection.
    Success = 0,
    /// The server denied the connection.
    Denied = -1,
    /// No response before the token expired.
    TimedOut = -2,
}

impl ConnectResult {
    /// Script-visible result code.
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Native socket state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SocketState {
    /// Not listening and not connected.
    #[default]
    Stopped,
    /// Listening for clients.
    Server,
    /// Connect in progress.
    Connecting,
    /// Connected to a server.
    Client,
}

/// Round-trip time statistics of a session, in nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rtt {
    /// Mean round-trip time.
    pub mean: u64,
    /// Variance of the round-trip time.
    pub variance: u64,
}

/// A pending promise together with its settle functions.
///
/// All three references are owned. The bridge hands `promise` to the
/// script and keeps `resolve`/`reject` until the operation settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromiseCapability {
    /// The promise object.
    pub promise: ObjectRef,
    /// The resolve function.
    pub resolve: ObjectRef,
    /// The reject function.
    pub reject: ObjectRef,
}

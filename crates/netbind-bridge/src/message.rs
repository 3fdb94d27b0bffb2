//! Message peers and payload access.
//!
//! Each message peer holds one native reference. Typed accessors are
//! little-endian and go through the scratch arena.

use crate::context::Context;
use crate::error::BridgeError;
use crate::proxy::{self, bindings};
use netbind_core::{MessageId, NativeEngine, NativeError, ObjectRef, ScriptHost};
use netbind_pool::SlotKey;

macro_rules! typed_access {
    ($($ty:ty => $read:ident, $write:ident;)*) => {
        $(
            #[doc = concat!("Read a little-endian `", stringify!($ty), "`.")]
            pub fn $read(&mut self, this: ObjectRef) -> Result<$ty, BridgeError> {
                self.message_read_array(this).map(<$ty>::from_le_bytes)
            }

            #[doc = concat!("Append a little-endian `", stringify!($ty), "`.")]
            pub fn $write(&mut self, this: ObjectRef, value: $ty) -> Result<(), BridgeError> {
                self.message_write(this, &value.to_le_bytes())
            }
        )*
    };
}

impl<N: NativeEngine, S: ScriptHost> Context<N, S> {
    fn message_key(&self, this: ObjectRef) -> Result<SlotKey, BridgeError> {
        proxy::key_of::<MessageId>(&self.host, this)
    }

    fn message_id(&self, this: ObjectRef) -> Result<MessageId, BridgeError> {
        let key = self.message_key(this)?;
        proxy::native_of(&self.pools.messages, key)
    }

    /// Wrap `message` in a fresh peer holding its own reference. Owned
    /// reference to the peer.
    pub(crate) fn message_peer(&mut self, message: MessageId) -> Result<ObjectRef, BridgeError> {
        let mut env = bindings!(self);
        proxy::create_peer(&mut self.pools.messages, &mut env, message)
    }

    /// Acquire an empty native message and return its peer.
    pub fn message_new(&mut self) -> Result<ObjectRef, BridgeError> {
        let message = self
            .engine
            .acquire_message()
            .map_err(BridgeError::native("acquire message"))?;
        let peer = self.message_peer(message);
        // The peer took its own reference.
        self.engine.unref_message(message);
        peer
    }

    /// Clear the payload.
    pub fn message_reset(&mut self, this: ObjectRef) -> Result<(), BridgeError> {
        let message = self.message_id(this)?;
        self.engine
            .message_reset(message)
            .map_err(BridgeError::native("reset message"))
    }

    /// Payload size in bytes; 0 once the peer has let go of the message.
    pub fn message_size(&self, this: ObjectRef) -> Result<usize, BridgeError> {
        let key = self.message_key(this)?;
        let Some(message) = self.pools.messages.get(key).and_then(|p| p.native()) else {
            return Ok(0);
        };
        self.engine
            .message_size(message)
            .map_err(BridgeError::native("get message size"))
    }

    /// Read `len` bytes at the read cursor.
    ///
    /// A length past the whole payload underflows before the scratch
    /// arena is touched.
    pub fn message_read(&mut self, this: ObjectRef, len: usize) -> Result<Vec<u8>, BridgeError> {
        let message = self.message_id(this)?;
        let size = self
            .engine
            .message_size(message)
            .map_err(BridgeError::native("read message"))?;
        if len > size {
            return Err(BridgeError::native("read message")(NativeError::Underflow));
        }
        let mut buf = self.scratch.acquire(len)?;
        self.engine
            .message_read(message, &mut buf)
            .map_err(BridgeError::native("read message"))?;
        Ok(buf.to_vec())
    }

    /// Append raw bytes.
    pub fn message_write(&mut self, this: ObjectRef, bytes: &[u8]) -> Result<(), BridgeError> {
        let message = self.message_id(this)?;
        self.engine
            .message_write(message, bytes)
            .map_err(BridgeError::native("write message"))
    }

    fn message_read_array<const LEN: usize>(
        &mut self,
        this: ObjectRef,
    ) -> Result<[u8; LEN], BridgeError> {
        let message = self.message_id(this)?;
        let mut buf = self.scratch.acquire(LEN)?;
        self.engine
            .message_read(message, &mut buf)
            .map_err(BridgeError::native("read message"))?;
        let mut out = [0u8; LEN];
        out.copy_from_slice(&buf);
        Ok(out)
    }

    typed_access! {
        u8 => message_read_u8, message_write_u8;
        u16 => message_read_u16, message_write_u16;
        u32 => message_read_u32, message_write_u32;
        u64 => message_read_u64, message_write_u64;
        i8 => message_read_i8, message_write_i8;
        i16 => message_read_i16, message_write_i16;
        i32 => message_read_i32, message_write_i32;
        i64 => message_read_i64, message_write_i64;
        f32 => message_read_f32, message_write_f32;
        f64 => message_read_f64, message_write_f64;
    }
}


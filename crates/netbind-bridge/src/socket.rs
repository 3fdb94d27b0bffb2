//! Socket peers: construction, listener wiring, listen/connect/stop/send.

use crate::completion::{self, Settle};
use crate::context::Context;
use crate::error::BridgeError;
use crate::proxy::{self, bindings, native_of, Auxiliary};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use netbind_core::{
    ChannelMode, ListenParams, MessageId, NativeEngine, ObjectRef, ScriptError, ScriptHost,
    SendTarget, SessionId, SocketId, SocketState, Value, CONNECT_TOKEN_BYTES, KEY_BYTES,
    MAX_CHANNELS,
};
use netbind_pool::SlotKey;
use smallvec::SmallVec;
use tracing::{debug, warn};

/// Length of a connect token in standard padded base64.
const BASE64_TOKEN_LEN: usize = CONNECT_TOKEN_BYTES.div_ceil(3) * 4;

/// A connect token as handed over by the script.
#[derive(Clone, Copy, Debug)]
pub enum ConnectToken<'a> {
    /// Raw token bytes.
    Bytes(&'a [u8]),
    /// Standard base64 text.
    Base64(&'a str),
}

/// Listener and promise state of a socket proxy.
#[derive(Debug, Default)]
pub(crate) struct SocketSlots {
    pub listener: Option<ObjectRef>,
    pub on_connected: Option<ObjectRef>,
    pub on_disconnected: Option<ObjectRef>,
    pub on_received: Option<ObjectRef>,
    pub connect: Option<Settle>,
}

impl SocketSlots {
    fn release_listener(&mut self, host: &mut dyn ScriptHost) {
        let held = [
            self.listener.take(),
            self.on_connected.take(),
            self.on_disconnected.take(),
            self.on_received.take(),
        ];
        for object in held.into_iter().flatten() {
            host.free(object);
        }
    }
}

impl Auxiliary for SocketSlots {
    fn release(&mut self, host: &mut dyn ScriptHost) {
        self.release_listener(host);
        if let Some(settle) = self.connect.take() {
            settle.discard(host);
        }
    }
}

/// Read `name` off `listener`, keeping it only if it is callable.
fn callback(
    host: &mut dyn ScriptHost,
    listener: ObjectRef,
    name: &str,
) -> Result<Option<ObjectRef>, BridgeError> {
    let value = host.get_property(listener, name)?;
    if host.is_function(&value) {
        Ok(value.as_object())
    } else {
        host.free_value(value);
        Ok(None)
    }
}

fn read_listener(
    host: &mut dyn ScriptHost,
    listener: ObjectRef,
    slots: &mut SocketSlots,
) -> Result<(), BridgeError> {
    slots.listener = Some(host.dup(listener));
    slots.on_connected = callback(host, listener, "onConnected")?;
    slots.on_disconnected = callback(host, listener, "onDisconnected")?;
    slots.on_received = callback(host, listener, "onReceived")?;
    Ok(())
}

impl<N: NativeEngine, S: ScriptHost> Context<N, S> {
    pub(crate) fn socket_key(&self, this: ObjectRef) -> Result<(SlotKey, SocketId), BridgeError> {
        let key = proxy::key_of::<SocketId>(&self.host, this)?;
        Ok((key, native_of(&self.pools.sockets, key)?))
    }

    /// Create a socket with one channel per mode and return its peer.
    pub fn socket_new(&mut self, modes: &[i32]) -> Result<ObjectRef, BridgeError> {
        if modes.is_empty() || modes.len() > MAX_CHANNELS {
            return Err(BridgeError::InvalidArgument("Invalid number of channels"));
        }
        let modes = modes
            .iter()
            .map(|&mode| ChannelMode::try_from(mode))
            .collect::<Result<SmallVec<[ChannelMode; 8]>, _>>()
            .map_err(|_| BridgeError::InvalidArgument("Invalid channel mode"))?;

        let socket = self
            .engine
            .create_socket(&modes)
            .map_err(BridgeError::native("create socket"))?;
        let mut env = bindings!(self);
        match proxy::create_peer(&mut self.pools.sockets, &mut env, socket) {
            Ok(object) => Ok(object),
            Err(e) => {
                env.engine.destroy_socket(socket);
                Err(e)
            }
        }
    }

    /// Install `listener`, replacing the previous one. `null` or
    /// `undefined` clears it.
    ///
    /// The listener's `onConnected`, `onDisconnected` and `onReceived`
    /// properties are read once, here.
    pub fn socket_set_listener(
        &mut self,
        this: ObjectRef,
        listener: &Value,
    ) -> Result<(), BridgeError> {
        let (key, _) = self.socket_key(this)?;
        let listener = match listener {
            Value::Object(object) => Some(*object),
            other if other.is_nullish() => None,
            _ => return Err(BridgeError::InvalidArgument("Listener must be an object")),
        };

        let mut slots = SocketSlots::default();
        if let Some(listener) = listener {
            if let Err(e) = read_listener(&mut self.host, listener, &mut slots) {
                slots.release(&mut self.host);
                return Err(e);
            }
        }

        let Some(proxy) = self.pools.sockets.get_mut(key) else {
            slots.release(&mut self.host);
            return Err(BridgeError::InvalidHandle {
                kind: netbind_core::EntityKind::Socket,
            });
        };
        slots.connect = proxy.aux.connect.take();
        let mut old = std::mem::replace(&mut proxy.aux, slots);
        old.release(&mut self.host);
        Ok(())
    }

    /// Start listening. Returns a promise that is already settled: resolved
    /// when the engine accepted, rejected with `"Failed to listen"` otherwise.
    pub fn socket_listen(
        &mut self,
        this: ObjectRef,
        private_key: &[u8],
        protocol_id: u64,
        max_clients: usize,
        address: &str,
    ) -> Result<ObjectRef, BridgeError> {
        let (key, socket) = self.socket_key(this)?;
        if private_key.len() != KEY_BYTES {
            return Err(BridgeError::InvalidArgument("Invalid private key"));
        }
        if max_clients == 0 {
            return Err(BridgeError::InvalidArgument("Invalid max clients"));
        }
        let address: std::net::SocketAddr = address
            .parse()
            .map_err(|_| BridgeError::InvalidArgument("Invalid address"))?;

        let (promise, settle) = Settle::split(self.host.new_promise()?);
        let params = ListenParams {
            private_key,
            protocol_id,
            max_clients,
            address,
        };
        match self.engine.listen(socket, &params) {
            Ok(()) => {
                self.mark_running(key);
                settle.resolve(&mut self.host, Value::Undefined);
            }
            Err(err) => {
                warn!(%socket, %err, "listen refused");
                settle.reject(
                    &mut self.host,
                    Value::Error(ScriptError::error("Failed to listen")),
                );
            }
        }
        Ok(promise)
    }

    /// Start connecting. The returned promise resolves with the connect
    /// result code once the engine reports it, or is rejected with
    /// `"Failed to connect"` if the engine refuses outright.
    ///
    /// Text tokens are base64-decoded through the scratch arena.
    pub fn socket_connect(
        &mut self,
        this: ObjectRef,
        token: ConnectToken<'_>,
    ) -> Result<ObjectRef, BridgeError> {
        let (key, socket) = self.socket_key(this)?;

        // Standard base64 decoding wants room for a whole final quantum.
        let mut buf = self.scratch.acquire(CONNECT_TOKEN_BYTES + 2)?;
        match token {
            ConnectToken::Bytes(bytes) => {
                if bytes.len() != CONNECT_TOKEN_BYTES {
                    return Err(BridgeError::InvalidArgument("Invalid connect token"));
                }
                buf[..CONNECT_TOKEN_BYTES].copy_from_slice(bytes);
            }
            ConnectToken::Base64(text) => {
                if text.len() != BASE64_TOKEN_LEN {
                    return Err(BridgeError::InvalidArgument(
                        "Invalid base64 connect token length",
                    ));
                }
                let decoded = STANDARD.decode_slice(text, &mut buf[..]).map_err(|_| {
                    BridgeError::InvalidArgument("Failed to decode base64 connect token")
                })?;
                if decoded != CONNECT_TOKEN_BYTES {
                    return Err(BridgeError::InvalidArgument(
                        "Failed to decode base64 connect token",
                    ));
                }
            }
        }

        let (promise, settle) = Settle::split(self.host.new_promise()?);
        let outcome = self.engine.connect(socket, &buf[..CONNECT_TOKEN_BYTES]);
        drop(buf);

        match outcome {
            Ok(()) => {
                self.mark_running(key);
                match self.pools.sockets.get_mut(key) {
                    Some(proxy) => {
                        if let Some(stale) = proxy.aux.connect.replace(settle) {
                            stale.discard(&mut self.host);
                        }
                    }
                    None => settle.discard(&mut self.host),
                }
            }
            Err(err) => {
                warn!(%socket, %err, "connect refused");
                settle.reject(
                    &mut self.host,
                    Value::Error(ScriptError::error("Failed to connect")),
                );
            }
        }
        Ok(promise)
    }

    /// Stop the socket. Stopping a stopped socket does nothing.
    pub fn socket_stop(&mut self, this: ObjectRef) -> Result<(), BridgeError> {
        let (key, _) = self.socket_key(this)?;
        self.stop_socket(key);
        Ok(())
    }

    /// Send `message` on channel `channel_index` to every recipient that
    /// is a live session peer; other recipients are skipped.
    ///
    /// Returns a promise resolving with the number of deliveries.
    pub fn socket_send(
        &mut self,
        this: ObjectRef,
        channel_index: usize,
        message: ObjectRef,
        recipients: &[ObjectRef],
    ) -> Result<ObjectRef, BridgeError> {
        let (_, socket) = self.socket_key(this)?;
        let message_key = proxy::key_of::<MessageId>(&self.host, message)?;

        self.send_targets.clear();
        for &recipient in recipients {
            let session = proxy::key_of::<SessionId>(&self.host, recipient)
                .and_then(|key| native_of(&self.pools.sessions, key));
            if let Ok(session) = session {
                self.send_targets.push(session);
            }
        }

        let mut env = bindings!(self);
        let pending = completion::begin(
            &mut self.pools.completions,
            &self.pools.messages,
            &mut env,
            message_key,
        )?;
        self.engine.send(
            SendTarget::Socket {
                socket,
                channel_index,
                recipients: &self.send_targets,
            },
            pending.message,
            pending.token,
        );
        Ok(pending.promise)
    }

    /// Engine clock as seen by the socket.
    pub fn socket_time(&self, this: ObjectRef) -> Result<u64, BridgeError> {
        let (_, socket) = self.socket_key(this)?;
        self.engine
            .time(socket)
            .map_err(BridgeError::native("read socket time"))
    }

    /// Pin the socket's peer and enter the running set.
    fn mark_running(&mut self, key: SlotKey) {
        if let Some(proxy) = self.pools.sockets.get_mut(key) {
            proxy.pin(&mut self.host);
            self.running.register(key);
            debug!(%key, "socket running");
        }
    }

    /// Stop the native socket if needed, unpin its peer and leave the
    /// running set.
    pub(crate) fn stop_socket(&mut self, key: SlotKey) {
        self.running.unregister(key);
        let Some(proxy) = self.pools.sockets.get_mut(key) else {
            return;
        };
        if let Some(socket) = proxy.native() {
            if self.engine.socket_state(socket) != SocketState::Stopped {
                self.engine.stop(socket);
            }
        }
        proxy.unpin(&mut self.host);
    }

    /// Leave the running set after a failed connect.
    pub(crate) fn socket_stopped(&mut self, key: SlotKey) {
        self.running.unregister(key);
        if let Some(proxy) = self.pools.sockets.get_mut(key) {
            proxy.unpin(&mut self.host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_token_length_matches_encoder() {
        let token = vec![0xA5u8; CONNECT_TOKEN_BYTES];
        assert_eq!(STANDARD.encode(&token).len(), BASE64_TOKEN_LEN);
    }

    #[test]
    fn scratch_room_fits_decode_estimate() {
        let text = STANDARD.encode(vec![7u8; CONNECT_TOKEN_BYTES]);
        let mut out = vec![0u8; CONNECT_TOKEN_BYTES + 2];
        assert_eq!(
            STANDARD.decode_slice(&text, &mut out).unwrap(),
            CONNECT_TOKEN_BYTES
        );
    }
}

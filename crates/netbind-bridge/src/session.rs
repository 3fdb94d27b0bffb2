//! Session peers.
//!
//! Sessions belong to the native engine. Their peers are pinned until
//! the engine cleans the session up, so a script never observes a
//! session object whose proxy has been recycled underneath it.

use crate::completion;
use crate::context::Context;
use crate::error::BridgeError;
use crate::proxy::{self, bindings, native_of, Auxiliary};
use netbind_core::{
    ChannelId, ChannelMode, MessageId, NativeEngine, ObjectRef, Rtt, ScriptHost, SendTarget,
    SessionId, Value,
};
use netbind_pool::SlotKey;
use smallvec::SmallVec;

/// Cached script state of a session proxy.
#[derive(Debug, Default)]
pub(crate) struct SessionSlots {
    /// Array of channel peers, built on first access.
    channels: Option<ObjectRef>,
}

impl Auxiliary for SessionSlots {
    fn release(&mut self, host: &mut dyn ScriptHost) {
        if let Some(channels) = self.channels.take() {
            host.free(channels);
        }
    }
}

impl<N: NativeEngine, S: ScriptHost> Context<N, S> {
    fn session_key(&self, this: ObjectRef) -> Result<(SlotKey, SessionId), BridgeError> {
        let key = proxy::key_of::<SessionId>(&self.host, this)?;
        Ok((key, native_of(&self.pools.sessions, key)?))
    }

    /// The peer of `session`, creating it on first sight. Owned reference.
    pub(crate) fn session_peer(&mut self, session: SessionId) -> Result<ObjectRef, BridgeError> {
        if let Some(key) = proxy::key_from_extra(&self.pools.sessions, &self.engine, session) {
            if let Some(peer) = self.pools.sessions.get(key).and_then(|p| p.peer()) {
                return Ok(self.host.dup(peer));
            }
        }
        let mut env = bindings!(self);
        proxy::create_peer(&mut self.pools.sessions, &mut env, session)
    }

    fn session_channel(&self, session: SessionId, index: usize) -> Result<ChannelId, BridgeError> {
        let channels = self
            .engine
            .session_channels(session)
            .map_err(BridgeError::native("get session channels"))?;
        channels
            .get(index)
            .copied()
            .ok_or(BridgeError::InvalidArgument("Invalid channel index"))
    }

    /// Client id of the session.
    pub fn session_id(&self, this: ObjectRef) -> Result<i64, BridgeError> {
        let (_, session) = self.session_key(this)?;
        self.engine
            .session_client_id(session)
            .map_err(BridgeError::native("get session id"))
    }

    /// Send `message` to this session on channel `channel_index`.
    pub fn session_send(
        &mut self,
        this: ObjectRef,
        channel_index: usize,
        message: ObjectRef,
    ) -> Result<ObjectRef, BridgeError> {
        let (_, session) = self.session_key(this)?;
        let message_key = proxy::key_of::<MessageId>(&self.host, message)?;
        let mut env = bindings!(self);
        let pending = completion::begin(
            &mut self.pools.completions,
            &self.pools.messages,
            &mut env,
            message_key,
        )?;
        self.engine.send(
            SendTarget::Session {
                session,
                channel_index,
            },
            pending.message,
            pending.token,
        );
        Ok(pending.promise)
    }

    /// Ask the engine to disconnect the session. The peer stays valid
    /// until the engine's cleanup arrives.
    pub fn session_disconnect(&mut self, this: ObjectRef) -> Result<bool, BridgeError> {
        let (_, session) = self.session_key(this)?;
        Ok(self.engine.session_disconnect(session).is_ok())
    }

    /// Change the mode of channel `index`. Returns whether the engine
    /// applied it.
    pub fn session_set_channel_mode(
        &mut self,
        this: ObjectRef,
        index: usize,
        mode: i32,
    ) -> Result<bool, BridgeError> {
        let (_, session) = self.session_key(this)?;
        let mode =
            ChannelMode::try_from(mode).map_err(|_| BridgeError::InvalidArgument("Invalid mode"))?;
        let Ok(channel) = self.session_channel(session, index) else {
            return Ok(false);
        };
        Ok(self.engine.set_channel_mode(channel, mode).is_ok())
    }

    /// Mode of channel `index`.
    pub fn session_channel_mode(
        &self,
        this: ObjectRef,
        index: usize,
    ) -> Result<ChannelMode, BridgeError> {
        let (_, session) = self.session_key(this)?;
        let channel = self.session_channel(session, index)?;
        self.engine
            .channel_mode(channel)
            .map_err(BridgeError::native("get channel mode"))
    }

    /// Round-trip time statistics.
    pub fn session_rtt(&self, this: ObjectRef) -> Result<Rtt, BridgeError> {
        let (_, session) = self.session_key(this)?;
        self.engine
            .session_rtt(session)
            .map_err(BridgeError::native("get session rtt"))
    }

    /// Array of the session's channel peers. Built on first access and
    /// cached on the proxy; every call returns a new reference to the
    /// same array.
    pub fn session_channels(&mut self, this: ObjectRef) -> Result<ObjectRef, BridgeError> {
        let (key, session) = self.session_key(this)?;
        if let Some(cached) = self.pools.sessions.get(key).and_then(|p| p.aux.channels) {
            return Ok(self.host.dup(cached));
        }

        let ids: SmallVec<[ChannelId; 4]> = self
            .engine
            .session_channels(session)
            .map_err(BridgeError::native("get session channels"))?;
        let mut items = Vec::with_capacity(ids.len());
        for channel in ids {
            match self.channel_peer(channel) {
                Ok(peer) => items.push(Value::Object(peer)),
                Err(e) => {
                    for item in items {
                        self.host.free_value(item);
                    }
                    return Err(e);
                }
            }
        }
        let array = self.host.new_array(items)?;

        match self.pools.sessions.get_mut(key) {
            Some(proxy) => {
                proxy.aux.channels = Some(array);
                Ok(self.host.dup(array))
            }
            None => Ok(array),
        }
    }
}

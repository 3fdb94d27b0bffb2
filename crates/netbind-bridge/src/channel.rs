//! Channel peers.

use crate::completion;
use crate::context::Context;
use crate::error::BridgeError;
use crate::proxy::{self, bindings, native_of};
use netbind_core::{
    ChannelId, ChannelMode, MessageId, NativeEngine, ObjectRef, ScriptHost, SendTarget,
};

impl<N: NativeEngine, S: ScriptHost> Context<N, S> {
    fn channel_id(&self, this: ObjectRef) -> Result<ChannelId, BridgeError> {
        let key = proxy::key_of::<ChannelId>(&self.host, this)?;
        native_of(&self.pools.channels, key)
    }

    /// The peer of `channel`, creating it on first sight. Owned reference.
    pub(crate) fn channel_peer(&mut self, channel: ChannelId) -> Result<ObjectRef, BridgeError> {
        if let Some(key) = proxy::key_from_extra(&self.pools.channels, &self.engine, channel) {
            if let Some(peer) = self.pools.channels.get(key).and_then(|p| p.peer()) {
                return Ok(self.host.dup(peer));
            }
        }
        let mut env = bindings!(self);
        proxy::create_peer(&mut self.pools.channels, &mut env, channel)
    }

    /// Delivery mode of the channel.
    pub fn channel_mode(&self, this: ObjectRef) -> Result<ChannelMode, BridgeError> {
        let channel = self.channel_id(this)?;
        self.engine
            .channel_mode(channel)
            .map_err(BridgeError::native("get channel mode"))
    }

    /// Change the delivery mode. Codes outside 0..=2 are rejected.
    pub fn channel_set_mode(&mut self, this: ObjectRef, mode: i32) -> Result<(), BridgeError> {
        let channel = self.channel_id(this)?;
        let mode =
            ChannelMode::try_from(mode).map_err(|_| BridgeError::InvalidArgument("Invalid mode"))?;
        self.engine
            .set_channel_mode(channel, mode)
            .map_err(BridgeError::native("set channel mode"))
    }

    /// Send `message` on this channel.
    pub fn channel_send(
        &mut self,
        this: ObjectRef,
        message: ObjectRef,
    ) -> Result<ObjectRef, BridgeError> {
        let channel = self.channel_id(this)?;
        let message_key = proxy::key_of::<MessageId>(&self.host, message)?;
        let mut env = bindings!(self);
        let pending = completion::begin(
            &mut self.pools.completions,
            &self.pools.messages,
            &mut env,
            message_key,
        )?;
        self.engine
            .send(SendTarget::Channel(channel), pending.message, pending.token);
        Ok(pending.promise)
    }
}

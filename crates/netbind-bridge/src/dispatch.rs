//! Dispatch of queued native events and finalizations.

use crate::completion;
use crate::context::Context;
use crate::link::Transition;
use crate::proxy::{self, bindings, Auxiliary, Bindings, Entity, ProxyPool};
use netbind_core::{
    ConnectResult, EntityKind, Finalization, MessageId, NativeEngine, NativeEntity, NativeEvent,
    ObjectRef, ScriptHost, SessionId, SocketId, Value,
};
use netbind_pool::SlotKey;
use tracing::{debug, warn};

/// Detach the proxy bound to `native`, or just acknowledge the cleanup
/// when no proxy is bound.
fn detach_entity<E: Entity, A: Auxiliary>(
    pool: &mut ProxyPool<E, A>,
    env: &mut Bindings<'_>,
    native: E,
) -> Transition {
    match proxy::key_from_extra(pool, &*env.engine, native) {
        Some(key) => proxy::detach_native(pool, env, key),
        None => {
            env.engine.set_extra(native.native(), None);
            Transition::Ignored
        }
    }
}

impl<N: NativeEngine, S: ScriptHost> Context<N, S> {
    pub(crate) fn dispatch_event(&mut self, event: NativeEvent) {
        match event {
            NativeEvent::Connected { socket, session } => self.on_connected(socket, session),
            NativeEvent::Disconnected { socket, session } => self.on_disconnected(socket, session),
            NativeEvent::Received {
                socket,
                session,
                message,
            } => {
                self.on_received(socket, session, message);
                self.engine.unref_message(message);
            }
            NativeEvent::ConnectResult { socket, result } => self.on_connect_result(socket, result),
            NativeEvent::SendCompleted {
                message,
                token,
                count,
            } => {
                let mut env = bindings!(self);
                completion::settle(&mut self.pools.completions, &mut env, token, message, count);
            }
            NativeEvent::Cleanup(entity) => self.on_cleanup(entity),
        }
    }

    pub(crate) fn dispatch_finalization(&mut self, finalization: Finalization) {
        let key = SlotKey::from_raw(finalization.key);
        let mut env = bindings!(self);
        let transition = match finalization.kind {
            EntityKind::Socket => {
                self.running.unregister(key);
                proxy::finalize(&mut self.pools.sockets, &mut env, key)
            }
            EntityKind::Session => proxy::finalize(&mut self.pools.sessions, &mut env, key),
            EntityKind::Channel => proxy::finalize(&mut self.pools.channels, &mut env, key),
            EntityKind::Message => proxy::finalize(&mut self.pools.messages, &mut env, key),
        };
        debug!(kind = %finalization.kind, %key, ?transition, "peer finalized");
    }

    /// Socket proxy key plus the listener and one of its callbacks.
    fn listener_of(
        &self,
        socket: SocketId,
        pick: fn(&crate::socket::SocketSlots) -> Option<ObjectRef>,
    ) -> Option<(SlotKey, Option<ObjectRef>, Option<ObjectRef>)> {
        let key = proxy::key_from_extra(&self.pools.sockets, &self.engine, socket)?;
        let proxy = self.pools.sockets.get(key)?;
        Some((key, proxy.aux.listener, pick(&proxy.aux)))
    }

    /// A new reference to the existing peer of `session`, if it has one.
    fn bound_session_peer(&mut self, session: SessionId) -> Option<ObjectRef> {
        let peer = proxy::key_from_extra(&self.pools.sessions, &self.engine, session)
            .and_then(|key| self.pools.sessions.get(key))
            .and_then(|p| p.peer())?;
        Some(self.host.dup(peer))
    }

    /// Call a listener callback, logging and swallowing what it throws.
    fn invoke(&mut self, callback: Option<ObjectRef>, listener: Option<ObjectRef>, args: &[Value]) {
        let Some(function) = callback else {
            return;
        };
        let this = listener.map_or(Value::Undefined, Value::Object);
        match self.host.call(function, &this, args) {
            Ok(result) => self.host.free_value(result),
            Err(err) => warn!(%err, "listener callback threw"),
        }
    }

    fn on_connected(&mut self, socket: SocketId, session: SessionId) {
        let Some((_, listener, callback)) = self.listener_of(socket, |s| s.on_connected) else {
            warn!(%socket, %session, "connection on unbound socket ignored");
            return;
        };
        let peer = match self.session_peer(session) {
            Ok(peer) => peer,
            Err(err) => {
                warn!(%session, %err, "failed to bind session");
                return;
            }
        };
        self.invoke(callback, listener, &[Value::Object(peer)]);
        self.host.free(peer);
    }

    fn on_disconnected(&mut self, socket: SocketId, session: SessionId) {
        let Some((_, listener, callback)) = self.listener_of(socket, |s| s.on_disconnected) else {
            warn!(%socket, %session, "disconnection on unbound socket ignored");
            return;
        };
        let Some(peer) = self.bound_session_peer(session) else {
            debug!(%session, "disconnected session has no peer");
            return;
        };
        self.invoke(callback, listener, &[Value::Object(peer)]);
        self.host.free(peer);
    }

    fn on_received(&mut self, socket: SocketId, session: SessionId, message: MessageId) {
        let Some((_, listener, callback)) = self.listener_of(socket, |s| s.on_received) else {
            warn!(%socket, %message, "message on unbound socket dropped");
            return;
        };
        if callback.is_none() {
            return;
        }
        // A session the engine already cleaned up has no peer to bind.
        let Some(session_peer) = self.bound_session_peer(session) else {
            warn!(%session, %message, "message from unbound session dropped");
            return;
        };
        match self.message_peer(message) {
            Ok(message_peer) => {
                self.invoke(
                    callback,
                    listener,
                    &[Value::Object(session_peer), Value::Object(message_peer)],
                );
                self.host.free(message_peer);
            }
            Err(err) => warn!(%message, %err, "failed to bind message"),
        }
        self.host.free(session_peer);
    }

    fn on_connect_result(&mut self, socket: SocketId, result: ConnectResult) {
        let Some(key) = proxy::key_from_extra(&self.pools.sockets, &self.engine, socket) else {
            warn!(%socket, ?result, "connect result for unbound socket ignored");
            return;
        };
        let settle = self
            .pools
            .sockets
            .get_mut(key)
            .and_then(|p| p.aux.connect.take());
        if result != ConnectResult::Success {
            self.socket_stopped(key);
        }
        match settle {
            Some(settle) => settle.resolve(&mut self.host, Value::Int(result.code())),
            None => debug!(%socket, ?result, "connect result without pending promise"),
        }
    }

    fn on_cleanup(&mut self, entity: NativeEntity) {
        let transition = match entity {
            NativeEntity::Socket(socket) => {
                if let Some(key) = proxy::key_from_extra(&self.pools.sockets, &self.engine, socket)
                {
                    self.running.unregister(key);
                }
                let mut env = bindings!(self);
                detach_entity(&mut self.pools.sockets, &mut env, socket)
            }
            NativeEntity::Session(session) => {
                let mut env = bindings!(self);
                detach_entity(&mut self.pools.sessions, &mut env, session)
            }
            NativeEntity::Channel(channel) => {
                let mut env = bindings!(self);
                detach_entity(&mut self.pools.channels, &mut env, channel)
            }
            // Messages go away only once nobody holds a reference.
            NativeEntity::Message(_) => Transition::Ignored,
        };
        debug!(%entity, ?transition, "native cleanup");
    }
}

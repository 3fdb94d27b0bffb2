//! Generic entity proxy: one native handle paired with one script peer.

use crate::error::BridgeError;
use crate::link::{LinkState, Side, Transition};
use netbind_core::{
    ChannelId, EntityKind, MessageId, NativeEngine, NativeEntity, ObjectRef, ScriptHost,
    SessionId, SocketId,
};
use netbind_pool::{Poolable, SlotKey, SlotPool};
use std::fmt;
use tracing::{debug, warn};

/// Mutable access to both collaborators, threaded through pool hooks.
pub(crate) struct Bindings<'a> {
    pub engine: &'a mut dyn NativeEngine,
    pub host: &'a mut dyn ScriptHost,
}

/// Split-borrow a context into [`Bindings`].
macro_rules! bindings {
    ($ctx:expr) => {
        $crate::proxy::Bindings {
            engine: &mut $ctx.engine,
            host: &mut $ctx.host,
        }
    };
}
pub(crate) use bindings;

/// A native handle type that can be proxied.
pub(crate) trait Entity: Copy + fmt::Display {
    const KIND: EntityKind;

    /// Whether the proxy holds a strong reference to its peer for as long
    /// as the native link lives.
    const PINS_PEER: bool;

    fn native(self) -> NativeEntity;

    /// Native-side work when a proxy links to this handle.
    fn link(self, engine: &mut dyn NativeEngine, key: SlotKey) -> Result<(), BridgeError> {
        engine.set_extra(self.native(), Some(key.to_raw()));
        Ok(())
    }

    /// Native-side work when a proxy lets go of this handle.
    fn unlink(self, engine: &mut dyn NativeEngine, key: SlotKey) {
        clear_extra(engine, self.native(), key);
    }
}

/// Clear the extra slot, unless it has since been pointed elsewhere.
fn clear_extra(engine: &mut dyn NativeEngine, entity: NativeEntity, key: SlotKey) {
    if engine.extra(entity) == Some(key.to_raw()) {
        engine.set_extra(entity, None);
    }
}

impl Entity for SocketId {
    const KIND: EntityKind = EntityKind::Socket;
    const PINS_PEER: bool = false;

    fn native(self) -> NativeEntity {
        NativeEntity::Socket(self)
    }

    // The script object owns the socket.
    fn unlink(self, engine: &mut dyn NativeEngine, key: SlotKey) {
        clear_extra(engine, self.native(), key);
        engine.destroy_socket(self);
    }
}

impl Entity for SessionId {
    const KIND: EntityKind = EntityKind::Session;
    const PINS_PEER: bool = true;

    fn native(self) -> NativeEntity {
        NativeEntity::Session(self)
    }
}

impl Entity for ChannelId {
    const KIND: EntityKind = EntityKind::Channel;
    const PINS_PEER: bool = true;

    fn native(self) -> NativeEntity {
        NativeEntity::Channel(self)
    }
}

// Several peers may wrap the same message, so messages carry no
// back-pointer. Each proxy holds one native reference instead.
impl Entity for MessageId {
    const KIND: EntityKind = EntityKind::Message;
    const PINS_PEER: bool = false;

    fn native(self) -> NativeEntity {
        NativeEntity::Message(self)
    }

    fn link(self, engine: &mut dyn NativeEngine, _key: SlotKey) -> Result<(), BridgeError> {
        engine
            .ref_message(self)
            .map_err(BridgeError::native("reference message"))
    }

    fn unlink(self, engine: &mut dyn NativeEngine, _key: SlotKey) {
        engine.unref_message(self);
    }
}

/// Kind-specific state hung off a proxy.
pub(crate) trait Auxiliary: Default {
    /// Give back every script reference the state holds.
    fn release(&mut self, host: &mut dyn ScriptHost);
}

impl Auxiliary for () {
    fn release(&mut self, _host: &mut dyn ScriptHost) {}
}

/// Bridge-side record linking one native entity to its script peer.
pub(crate) struct Proxy<E, A> {
    key: Option<SlotKey>,
    native: Option<E>,
    peer: Option<ObjectRef>,
    pinned: bool,
    link: LinkState,
    pub aux: A,
}

impl<E, A: Default> Default for Proxy<E, A> {
    fn default() -> Self {
        Self {
            key: None,
            native: None,
            peer: None,
            pinned: false,
            link: LinkState::Unattached,
            aux: A::default(),
        }
    }
}

impl<E: Entity, A> Proxy<E, A> {
    /// The native handle, while linked.
    pub fn native(&self) -> Option<E> {
        self.native
    }

    /// The script peer (borrowed, not counted).
    pub fn peer(&self) -> Option<ObjectRef> {
        self.peer
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    /// Take a strong reference to the peer. No-op if already pinned.
    pub fn pin(&mut self, host: &mut dyn ScriptHost) {
        if let (false, Some(peer)) = (self.pinned, self.peer) {
            host.dup(peer);
            self.pinned = true;
        }
    }

    /// Drop the strong reference to the peer, if held.
    pub fn unpin(&mut self, host: &mut dyn ScriptHost) {
        if self.pinned {
            self.pinned = false;
            if let Some(peer) = self.peer {
                host.free(peer);
            }
        }
    }
}

impl<'a, E: Entity, A: Auxiliary> Poolable<Bindings<'a>> for Proxy<E, A> {
    fn on_cleanup(&mut self, env: &mut Bindings<'a>) {
        if let (Some(native), Some(key)) = (self.native.take(), self.key) {
            native.unlink(env.engine, key);
        }
        self.unpin(env.host);
        self.aux.release(env.host);
        if let Some(key) = self.key {
            debug!(kind = %E::KIND, %key, "proxy released");
        }
        self.key = None;
        self.peer = None;
        self.link = LinkState::Unattached;
    }
}

pub(crate) type ProxyPool<E, A> = SlotPool<Proxy<E, A>>;

/// Resolve a script object to the key of its proxy.
pub(crate) fn key_of<E: Entity>(
    host: &dyn ScriptHost,
    object: ObjectRef,
) -> Result<SlotKey, BridgeError> {
    host.opaque(object, E::KIND)
        .map(SlotKey::from_raw)
        .ok_or(BridgeError::InvalidHandle { kind: E::KIND })
}

/// The native handle behind `key`, or `InvalidHandle` once detached.
pub(crate) fn native_of<E: Entity, A>(
    pool: &ProxyPool<E, A>,
    key: SlotKey,
) -> Result<E, BridgeError> {
    pool.get(key)
        .and_then(Proxy::native)
        .ok_or(BridgeError::InvalidHandle { kind: E::KIND })
}

/// The proxy key stored in a native entity's extra slot, if it still
/// names a live proxy of `pool`.
pub(crate) fn key_from_extra<E: Entity, A>(
    pool: &ProxyPool<E, A>,
    engine: &dyn NativeEngine,
    native: E,
) -> Option<SlotKey> {
    let key = SlotKey::from_raw(engine.extra(native.native())?);
    pool.contains(key).then_some(key)
}

/// Create a script peer for `native` and link the three parties.
///
/// Returns an owned reference to the new object. On failure nothing is
/// left linked and the native handle is untouched.
pub(crate) fn create_peer<E: Entity, A: Auxiliary>(
    pool: &mut ProxyPool<E, A>,
    env: &mut Bindings<'_>,
    native: E,
) -> Result<ObjectRef, BridgeError> {
    let object = env.host.new_object(E::KIND)?;
    let key = match pool.acquire(env) {
        Ok(key) => key,
        Err(e) => {
            env.host.free(object);
            return Err(e.into());
        }
    };

    let linked = env
        .host
        .set_opaque(object, key.to_raw())
        .map_err(BridgeError::from)
        .and_then(|()| native.link(env.engine, key));
    if let Err(e) = linked {
        // Release before freeing so the object's finalizer sees a stale key.
        pool.release(key, env);
        env.host.free(object);
        return Err(e);
    }

    let Some(proxy) = pool.get_mut(key) else {
        env.host.free(object);
        return Err(BridgeError::InvalidHandle { kind: E::KIND });
    };
    proxy.key = Some(key);
    proxy.native = Some(native);
    proxy.peer = Some(object);
    proxy.link.attach();
    if E::PINS_PEER {
        proxy.pin(env.host);
    }
    debug!(kind = %E::KIND, %key, %native, %object, "proxy attached");
    Ok(object)
}

/// The native engine destroyed the entity behind `key`.
pub(crate) fn detach_native<E: Entity, A: Auxiliary>(
    pool: &mut ProxyPool<E, A>,
    env: &mut Bindings<'_>,
    key: SlotKey,
) -> Transition {
    let Some(proxy) = pool.get_mut(key) else {
        return Transition::Ignored;
    };
    let transition = proxy.link.sever(Side::Native);
    match transition {
        Transition::Pending => {
            if let Some(native) = proxy.native.take() {
                clear_extra(env.engine, native.native(), key);
            }
            // Without the pin the peer becomes collectable, and its
            // finalizer completes the release.
            proxy.unpin(env.host);
            debug!(kind = %E::KIND, %key, "native side detached");
        }
        Transition::Release => {
            pool.release(key, env);
        }
        Transition::Ignored => {}
    }
    transition
}

/// The script host finalized the peer of `key`.
pub(crate) fn finalize<E: Entity, A: Auxiliary>(
    pool: &mut ProxyPool<E, A>,
    env: &mut Bindings<'_>,
    key: SlotKey,
) -> Transition {
    let Some(proxy) = pool.get_mut(key) else {
        warn!(kind = %E::KIND, %key, "finalizer for stale proxy ignored");
        return Transition::Ignored;
    };
    // The object is already gone, so whatever reference we held is moot.
    proxy.peer = None;
    proxy.pinned = false;

    let mut transition = proxy.link.sever(Side::Script);
    if transition == Transition::Pending {
        if let Some(native) = proxy.native.take() {
            native.unlink(env.engine, key);
        }
        transition = proxy.link.sever(Side::Native);
    }
    if transition == Transition::Release {
        pool.release(key, env);
    }
    transition
}

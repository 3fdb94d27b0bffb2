//! The runtime context: owner of every pool, queue and collaborator.

use crate::completion::CompletionPool;
use crate::config::BridgeConfig;
use crate::error::ContextError;
use crate::link::LinkState;
use crate::proxy::{Bindings, ProxyPool};
use crate::registry::RunningSet;
use crate::session::SessionSlots;
use crate::socket::SocketSlots;
use crate::stats::BindingStats;
use netbind_core::{
    event_channel, finalizer_channel, ChannelId, EntityKind, EventQueue, FinalizerQueue,
    MessageId, NativeEngine, NativeEvent, ObjectRef, ScriptHost, SessionId, SocketId,
};
use netbind_pool::{PoolError, ScratchArena, SlotKey, SlotPool};
use smallvec::SmallVec;
use tracing::{debug, info};

/// Proxy and completion pools, one per kind.
pub(crate) struct Pools {
    pub sockets: ProxyPool<SocketId, SocketSlots>,
    pub sessions: ProxyPool<SessionId, SessionSlots>,
    pub channels: ProxyPool<ChannelId, ()>,
    pub messages: ProxyPool<MessageId, ()>,
    pub completions: CompletionPool,
}

impl Pools {
    fn new(config: &BridgeConfig) -> Result<Self, PoolError> {
        Ok(Self {
            sockets: SlotPool::new("socket", &config.sockets)?,
            sessions: SlotPool::new("session", &config.sessions)?,
            channels: SlotPool::new("channel", &config.channels)?,
            messages: SlotPool::new("message", &config.messages)?,
            completions: SlotPool::new("send info", &config.completions)?,
        })
    }

    /// Release everything, sockets first so their native teardown runs
    /// before the sessions it orphans are swept.
    fn sweep(&mut self, env: &mut Bindings<'_>) -> usize {
        self.sockets.sweep(env)
            + self.messages.sweep(env)
            + self.sessions.sweep(env)
            + self.channels.sweep(env)
            + self.completions.sweep(env)
    }
}

/// Binding context for one native engine and one script runtime.
///
/// Created with [`Context::new`]; torn down with [`Context::shutdown`]
/// or on drop. All methods run on the owning thread. Collaborator
/// notifications are queued until [`Context::pump`].
pub struct Context<N: NativeEngine, S: ScriptHost> {
    pub(crate) engine: N,
    pub(crate) host: S,
    pub(crate) pools: Pools,
    pub(crate) running: RunningSet,
    pub(crate) scratch: ScratchArena,
    pub(crate) send_targets: SmallVec<[SessionId; 8]>,
    events: EventQueue,
    finalized: FinalizerQueue,
    torn_down: bool,
}

impl<N: NativeEngine, S: ScriptHost> Context<N, S> {
    /// Associate `engine` and `host` and build every pool.
    ///
    /// Construction order: engine association, pools, running set,
    /// scratch arena, host association. A failure at any step shuts the
    /// engine back down before returning.
    pub fn new(mut engine: N, mut host: S, config: BridgeConfig) -> Result<Self, ContextError> {
        config.validate()?;

        let (sink, events) = event_channel();
        engine.attach(sink)?;

        let built = Pools::new(&config)
            .map_err(ContextError::from)
            .and_then(|pools| {
                let running = RunningSet::new();
                let scratch = ScratchArena::new(config.scratch_bytes)?;
                Ok((pools, running, scratch))
            });
        let (pools, running, scratch) = match built {
            Ok(parts) => parts,
            Err(e) => {
                engine.shutdown();
                return Err(e);
            }
        };

        let (finalizer_sink, finalized) = finalizer_channel();
        if let Err(e) = host.attach(finalizer_sink) {
            engine.shutdown();
            return Err(e.into());
        }

        info!(scratch_bytes = config.scratch_bytes, "binding context created");
        Ok(Self {
            engine,
            host,
            pools,
            running,
            scratch,
            send_targets: SmallVec::new(),
            events,
            finalized,
            torn_down: false,
        })
    }

    /// The native engine.
    pub fn engine(&self) -> &N {
        &self.engine
    }

    /// The native engine, mutably. Anything it posts is dispatched on the
    /// next [`pump`](Self::pump).
    pub fn engine_mut(&mut self) -> &mut N {
        &mut self.engine
    }

    /// The script host.
    pub fn host(&self) -> &S {
        &self.host
    }

    /// The script host, mutably.
    pub fn host_mut(&mut self) -> &mut S {
        &mut self.host
    }

    /// The running set.
    pub fn running(&self) -> &RunningSet {
        &self.running
    }

    /// Bytes currently backing the scratch arena.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    /// Live proxy counts.
    pub fn statistics(&self) -> BindingStats {
        BindingStats {
            sockets: self.pools.sockets.in_use(),
            sessions: self.pools.sessions.in_use(),
            channels: self.pools.channels.in_use(),
            messages: self.pools.messages.in_use(),
            completions: self.pools.completions.in_use(),
            running: self.running.len(),
        }
    }

    /// Link state of the proxy behind `object`, or `None` if `object` is
    /// not a live peer of `kind`.
    pub fn link_state(&self, kind: EntityKind, object: ObjectRef) -> Option<LinkState> {
        let key = SlotKey::from_raw(self.host.opaque(object, kind)?);
        match kind {
            EntityKind::Socket => self.pools.sockets.get(key).map(|p| p.link_state()),
            EntityKind::Session => self.pools.sessions.get(key).map(|p| p.link_state()),
            EntityKind::Channel => self.pools.channels.get(key).map(|p| p.link_state()),
            EntityKind::Message => self.pools.messages.get(key).map(|p| p.link_state()),
        }
    }

    /// Dispatch queued native events and finalizations until both queues
    /// are empty. Returns how many were dispatched.
    pub fn pump(&mut self) -> usize {
        let mut dispatched = 0;
        loop {
            let mut round = 0;
            while let Some(event) = self.events.try_next() {
                self.dispatch_event(event);
                round += 1;
            }
            while let Some(finalization) = self.finalized.try_next() {
                self.dispatch_finalization(finalization);
                round += 1;
            }
            if round == 0 {
                return dispatched;
            }
            dispatched += round;
        }
    }

    /// Stop every running socket and empty the running set. Returns how
    /// many sockets were stopped. A second call stops nothing.
    pub fn drain_running(&mut self) -> usize {
        let keys = self.running.drain();
        let count = keys.len();
        for key in keys {
            self.stop_socket(key);
        }
        if count > 0 {
            debug!(count, "running set drained");
        }
        count
    }

    /// Empty the event queue, settling completed sends when `settle` is
    /// set and dropping everything else. Returns how many were dropped.
    fn flush_events(&mut self, settle: bool) -> usize {
        let mut discarded = 0;
        while let Some(event) = self.events.try_next() {
            match event {
                NativeEvent::SendCompleted { .. } if settle => self.dispatch_event(event),
                // Received events carry a message reference of their own.
                NativeEvent::Received { message, .. } => {
                    self.engine.unref_message(message);
                    discarded += 1;
                }
                _ => discarded += 1,
            }
        }
        discarded
    }

    /// Tear the context down. Dropping the context does the same.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let drained = self.drain_running();
        // Sends the engine already finished still resolve.
        let mut discarded = self.flush_events(true);

        let mut env = Bindings {
            engine: &mut self.engine,
            host: &mut self.host,
        };
        let swept = self.pools.sweep(&mut env);

        discarded += self.flush_events(false);
        while self.finalized.try_next().is_some() {
            discarded += 1;
        }

        self.send_targets = SmallVec::new();
        self.scratch.release_memory();
        self.host.detach();
        self.engine.shutdown();
        info!(drained, swept, discarded, "binding context torn down");
    }
}

impl<N: NativeEngine, S: ScriptHost> Drop for Context<N, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbind_core::NativeEntity;
    use netbind_pool::PoolConfig;
    use netbind_test_utils::{MockEngine, MockScriptHost};

    fn context() -> (Context<MockEngine, MockScriptHost>, MockEngine, MockScriptHost) {
        let engine = MockEngine::new();
        let host = MockScriptHost::new();
        let ctx = Context::new(engine.clone(), host.clone(), BridgeConfig::default()).unwrap();
        (ctx, engine, host)
    }

    #[test]
    fn new_attaches_both_collaborators() {
        let (ctx, engine, host) = context();
        assert!(engine.is_attached());
        assert!(host.is_attached());
        assert_eq!(ctx.statistics(), BindingStats::default());
    }

    #[test]
    fn invalid_config_leaves_engine_untouched() {
        let engine = MockEngine::new();
        let config = BridgeConfig {
            sockets: PoolConfig {
                max_in_use: Some(0),
                preallocate: 0,
            },
            ..BridgeConfig::default()
        };
        let result = Context::new(engine.clone(), MockScriptHost::new(), config);
        assert!(matches!(result, Err(ContextError::Config(_))));
        assert!(!engine.is_attached());
    }

    #[test]
    fn engine_attach_failure_is_reported() {
        let engine = MockEngine::new();
        let _first = Context::new(engine.clone(), MockScriptHost::new(), BridgeConfig::default())
            .unwrap();
        let second = Context::new(engine.clone(), MockScriptHost::new(), BridgeConfig::default());
        assert!(matches!(second, Err(ContextError::Native(_))));
    }

    #[test]
    fn pump_runs_until_queues_are_empty() {
        let (mut ctx, _engine, host) = context();
        let message = ctx.message_new().unwrap();
        assert_eq!(ctx.pump(), 0);
        host.release(message);
        assert_eq!(ctx.pump(), 1);
        assert_eq!(ctx.statistics().messages, 0);
    }

    #[test]
    fn link_state_follows_native_cleanup() {
        let (mut ctx, engine, host) = context();
        let socket = ctx.socket_new(&[2]).unwrap();
        assert_eq!(
            ctx.link_state(EntityKind::Socket, socket),
            Some(LinkState::Attached)
        );
        assert_eq!(ctx.link_state(EntityKind::Session, socket), None);

        let native = engine.socket_ids()[0];
        engine.kill_socket(native);
        ctx.pump();
        assert_eq!(
            ctx.link_state(EntityKind::Socket, socket),
            Some(LinkState::NativeDetached)
        );
        assert_eq!(engine.extra_of(NativeEntity::Socket(native)), None);

        host.release(socket);
        ctx.pump();
        assert_eq!(ctx.statistics().sockets, 0);
    }

    #[test]
    fn teardown_runs_once() {
        let (ctx, engine, host) = context();
        ctx.shutdown();
        assert!(engine.is_shut_down());
        assert!(!host.is_attached());
    }
}

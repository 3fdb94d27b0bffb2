//! Integration test: proxy lifecycles across both teardown orders.
//!
//! Every peer must be released exactly once, whichever side lets go
//! first, and a released peer must leave no native extra, no native
//! reference and no pinned script object behind.

mod common;

use common::{connect_peer, dup, fixture, fixture_with, serve};
use netbind_bridge::{BridgeConfig, BridgeError, LinkState};
use netbind_core::{EntityKind, NativeEntity, ScriptError, ScriptErrorKind, Value};
use netbind_pool::PoolConfig;
use netbind_test_utils::PromiseState;
use proptest::prelude::*;

#[test]
fn message_finalization_restores_pool_and_native_refs() {
    let mut f = fixture();
    let message = f.ctx.message_new().unwrap();
    assert_eq!(f.ctx.statistics().messages, 1);
    assert_eq!(f.engine.live_messages(), 1);

    f.host.release(message);
    assert_eq!(f.ctx.pump(), 1);
    assert_eq!(f.ctx.statistics().messages, 0);
    assert_eq!(f.engine.live_messages(), 0);
}

#[test]
fn socket_finalization_destroys_native_socket() {
    let mut f = fixture();
    let socket = f.ctx.socket_new(&[0, 1]).unwrap();
    assert_eq!(f.engine.socket_ids().len(), 1);

    f.host.release(socket);
    f.ctx.pump();
    assert_eq!(f.ctx.statistics().sockets, 0);
    assert!(f.engine.socket_ids().is_empty());
    assert_eq!(f.engine.destroyed_sockets(), 1);
}

#[test]
fn native_cleanup_then_finalization_releases_once() {
    let mut f = fixture();
    let socket = f.ctx.socket_new(&[2]).unwrap();
    let native = f.engine.socket_ids()[0];

    f.engine.kill_socket(native);
    f.ctx.pump();
    assert_eq!(f.ctx.statistics().sockets, 1);
    assert_eq!(
        f.ctx.link_state(EntityKind::Socket, socket),
        Some(LinkState::NativeDetached)
    );
    assert_eq!(f.engine.extra_of(NativeEntity::Socket(native)), None);

    // A detached peer reports an invalid handle instead of reaching the engine.
    let err = f.ctx.socket_time(socket).unwrap_err();
    assert_eq!(
        err,
        BridgeError::InvalidHandle {
            kind: EntityKind::Socket
        }
    );

    f.host.release(socket);
    f.ctx.pump();
    assert_eq!(f.ctx.statistics().sockets, 0);
    assert_eq!(f.host.finalized(), 1);
    assert_eq!(f.engine.destroyed_sockets(), 1);
}

#[test]
fn session_peer_is_released_after_native_cleanup() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 2]);
    let (session, peer) = connect_peer(&mut f, &server);
    assert_eq!(f.ctx.statistics().sessions, 1);
    assert_eq!(f.host.refs(peer), Some(1));
    assert!(f.engine.extra_of(NativeEntity::Session(session)).is_some());

    f.engine.drop_peer(server.native, session);
    f.ctx.pump();
    assert_eq!(f.host.calls(server.listener.on_disconnected).len(), 1);
    assert!(!f.host.is_alive(peer));
    assert_eq!(f.ctx.statistics().sessions, 0);
    assert_eq!(f.engine.session_records(), 0);
}

#[test]
fn script_reference_outlives_native_session() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let (session, peer) = connect_peer(&mut f, &server);
    let held = dup(&f.host, peer);

    f.engine.drop_peer(server.native, session);
    f.ctx.pump();
    assert_eq!(f.ctx.statistics().sessions, 1);
    assert_eq!(
        f.ctx.link_state(EntityKind::Session, held),
        Some(LinkState::NativeDetached)
    );
    assert_eq!(
        f.ctx.session_id(held).unwrap_err(),
        BridgeError::InvalidHandle {
            kind: EntityKind::Session
        }
    );
    // The engine record went away as soon as the extra was cleared.
    assert_eq!(f.engine.session_records(), 0);

    f.host.release(held);
    f.ctx.pump();
    assert_eq!(f.ctx.statistics().sessions, 0);
}

#[test]
fn channel_peers_follow_their_array() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 1]);
    let (session, peer) = connect_peer(&mut f, &server);

    let array = f.ctx.session_channels(peer).unwrap();
    assert_eq!(f.ctx.statistics().channels, 2);
    let channel = f.host.array_items(array)[1].as_object().unwrap();

    f.engine.drop_peer(server.native, session);
    f.ctx.pump();
    assert_eq!(f.ctx.statistics().sessions, 0);
    // The test still holds the array, so the channel peers survive detached.
    assert_eq!(f.ctx.statistics().channels, 2);
    assert!(f.ctx.channel_mode(channel).is_err());
    assert_eq!(f.engine.channel_records(), 0);

    f.host.release(array);
    f.ctx.pump();
    assert_eq!(f.ctx.statistics().channels, 0);
}

#[test]
fn failed_peer_creation_leaves_nothing_linked() {
    let mut f = fixture();
    f.host.fail_new_object(true);
    let err = f.ctx.socket_new(&[2]).unwrap_err();
    assert!(matches!(err, BridgeError::Script(_)));
    assert_eq!(
        ScriptError::from(&err).kind,
        ScriptErrorKind::InternalError
    );
    assert!(f.engine.socket_ids().is_empty());
    assert_eq!(f.ctx.statistics().sockets, 0);

    f.host.fail_new_object(false);
    assert!(f.ctx.socket_new(&[2]).is_ok());
}

#[test]
fn socket_pool_exhaustion_recovers_after_release() {
    let mut f = fixture_with(BridgeConfig {
        sockets: PoolConfig::bounded(1),
        ..BridgeConfig::default()
    });
    let first = f.ctx.socket_new(&[0]).unwrap();

    let err = f.ctx.socket_new(&[0]).unwrap_err();
    assert_eq!(err, BridgeError::PoolExhausted { pool: "socket" });
    assert_eq!(ScriptError::from(&err).message, "Failed to acquire socket");
    // The native socket created for the failed peer is gone again.
    assert_eq!(f.engine.socket_ids().len(), 1);

    f.host.release(first);
    f.ctx.pump();
    assert!(f.ctx.socket_new(&[0]).is_ok());
}

#[test]
fn statistics_count_live_proxies() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 2]);
    let (_, peer) = connect_peer(&mut f, &server);
    let _channels = f.ctx.session_channels(peer).unwrap();
    let _message = f.ctx.message_new().unwrap();

    let stats = f.ctx.statistics();
    assert_eq!(stats.sockets, 1);
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.channels, 2);
    assert_eq!(stats.messages, 1);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.proxies(), 5);
    assert_eq!(
        stats.to_string(),
        "sockets=1 sessions=1 channels=2 messages=1 completions=0 running=1"
    );
}

#[test]
fn shutdown_releases_every_native_resource() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 2]);
    let (session, peer) = connect_peer(&mut f, &server);
    let _channels = f.ctx.session_channels(peer).unwrap();
    let message = f.ctx.message_new().unwrap();
    let pending = f.ctx.session_send(peer, 1, message).unwrap();
    // Queued but never dispatched: teardown must drop its reference.
    f.engine.deliver(server.native, session, &[1, 2, 3]);

    let (engine, host) = (f.engine.clone(), f.host.clone());
    f.ctx.shutdown();

    assert!(engine.is_shut_down());
    assert!(!host.is_attached());
    assert_eq!(engine.stop_calls(), 1);
    assert_eq!(engine.live_messages(), 0);
    assert_eq!(engine.destroyed_sockets(), 1);
    // Pending sends are dropped without being settled.
    assert_eq!(host.promise_state(pending), Some(PromiseState::Pending));
    assert_eq!(host.refs(pending), Some(1));
    assert_eq!(host.refs(server.socket), Some(1));
}

#[test]
fn shutdown_settles_sends_the_engine_already_finished() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let (_, peer) = connect_peer(&mut f, &server);
    let message = f.ctx.message_new().unwrap();
    let finished = f.ctx.session_send(peer, 0, message).unwrap();
    f.engine.complete_sends();
    let pending = f.ctx.session_send(peer, 0, message).unwrap();

    let (engine, host) = (f.engine.clone(), f.host.clone());
    f.ctx.shutdown();

    assert_eq!(
        host.promise_state(finished),
        Some(PromiseState::Fulfilled(Value::Int(1)))
    );
    assert_eq!(host.promise_state(pending), Some(PromiseState::Pending));
    assert_eq!(engine.live_messages(), 0);
}

#[test]
fn dropping_the_context_tears_down() {
    let f = fixture();
    let (engine, host) = (f.engine.clone(), f.host.clone());
    drop(f);
    assert!(engine.is_shut_down());
    assert!(!host.is_attached());
    assert_eq!(host.live_objects(), 0);
}

#[test]
fn invalid_handles_are_rejected() {
    let mut f = fixture();
    let message = f.ctx.message_new().unwrap();
    let err = f.ctx.socket_stop(message).unwrap_err();
    assert_eq!(ScriptError::from(err).message, "Invalid native socket");

    let plain = f.host.new_plain(vec![("x", Value::Int(1))]);
    assert!(f.ctx.message_size(plain).is_err());
}

proptest! {
    #[test]
    fn message_pool_tracks_live_peers(ops in prop::collection::vec(any::<bool>(), 1..64)) {
        let mut f = fixture();
        let mut live = Vec::new();
        for create in ops {
            if create {
                live.push(f.ctx.message_new().unwrap());
            } else if let Some(message) = live.pop() {
                f.host.release(message);
                f.ctx.pump();
            }
            prop_assert_eq!(f.ctx.statistics().messages, live.len());
            prop_assert_eq!(f.engine.live_messages(), live.len());
        }
    }
}

//! Integration test: send completions.
//!
//! Every send resolves exactly once with the delivery count reported by
//! the engine, and the message stays alive until that happens even if
//! the script drops it.

mod common;

use common::{connect_peer, fixture, fixture_with, fulfilled, serve};
use netbind_bridge::{BridgeConfig, BridgeError};
use netbind_core::{EntityKind, ScriptError, Value};
use netbind_pool::PoolConfig;
use netbind_test_utils::PromiseState;

#[test]
fn session_send_resolves_with_delivery_count() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 2]);
    let (_, peer) = connect_peer(&mut f, &server);
    let message = f.ctx.message_new().unwrap();
    f.ctx.message_write_u16(message, 0xBEEF).unwrap();

    let promise = f.ctx.session_send(peer, 1, message).unwrap();
    assert_eq!(f.ctx.statistics().completions, 1);
    assert_eq!(f.engine.in_flight(), 1);
    assert_eq!(f.host.promise_state(promise), Some(PromiseState::Pending));

    assert_eq!(f.engine.complete_sends(), 1);
    f.ctx.pump();
    assert_eq!(fulfilled(&f.host, promise), Some(Value::Int(1)));
    assert_eq!(f.ctx.statistics().completions, 0);
    assert_eq!(f.engine.live_messages(), 1);
    assert_eq!(f.host.refs(message), Some(1));
}

#[test]
fn empty_broadcast_resolves_with_zero() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let message = f.ctx.message_new().unwrap();

    let promise = f.ctx.socket_send(server.socket, 0, message, &[]).unwrap();
    f.engine.complete_sends();
    f.ctx.pump();
    assert_eq!(fulfilled(&f.host, promise), Some(Value::Int(0)));
}

#[test]
fn broadcast_skips_recipients_that_are_not_sessions() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let (_, first) = connect_peer(&mut f, &server);
    let (_, second) = connect_peer(&mut f, &server);
    let message = f.ctx.message_new().unwrap();

    let recipients = [first, message, second, server.socket];
    let promise = f
        .ctx
        .socket_send(server.socket, 0, message, &recipients)
        .unwrap();
    f.engine.complete_sends();
    f.ctx.pump();
    assert_eq!(fulfilled(&f.host, promise), Some(Value::Int(2)));
}

#[test]
fn dropped_message_is_kept_until_the_send_settles() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let (_, peer) = connect_peer(&mut f, &server);
    let message = f.ctx.message_new().unwrap();
    let promise = f.ctx.session_send(peer, 0, message).unwrap();

    f.host.release(message);
    f.ctx.pump();
    assert!(f.host.is_alive(message));
    assert_eq!(f.ctx.statistics().messages, 1);

    f.engine.complete_sends();
    f.ctx.pump();
    assert_eq!(fulfilled(&f.host, promise), Some(Value::Int(1)));
    assert!(!f.host.is_alive(message));
    assert_eq!(f.ctx.statistics().messages, 0);
    assert_eq!(f.engine.live_messages(), 0);
}

#[test]
fn exhausted_completion_pool_fails_synchronously() {
    let mut f = fixture_with(BridgeConfig {
        completions: PoolConfig::bounded(1),
        ..BridgeConfig::default()
    });
    let server = serve(&mut f, &[2]);
    let (_, peer) = connect_peer(&mut f, &server);
    let message = f.ctx.message_new().unwrap();

    let first = f.ctx.session_send(peer, 0, message).unwrap();
    let err = f.ctx.session_send(peer, 0, message).unwrap_err();
    assert_eq!(err, BridgeError::PoolExhausted { pool: "send info" });
    assert_eq!(
        ScriptError::from(&err).message,
        "Failed to acquire send info"
    );
    assert_eq!(f.engine.in_flight(), 1);

    f.engine.complete_sends();
    f.ctx.pump();
    assert_eq!(fulfilled(&f.host, first), Some(Value::Int(1)));
    assert!(f.ctx.session_send(peer, 0, message).is_ok());
}

#[test]
fn out_of_range_channel_resolves_with_zero() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let (_, peer) = connect_peer(&mut f, &server);
    let message = f.ctx.message_new().unwrap();

    let promise = f.ctx.session_send(peer, 9, message).unwrap();
    f.engine.complete_sends();
    f.ctx.pump();
    assert_eq!(fulfilled(&f.host, promise), Some(Value::Int(0)));
}

#[test]
fn channel_send_stops_working_once_detached() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 2]);
    let (session, peer) = connect_peer(&mut f, &server);
    let array = f.ctx.session_channels(peer).unwrap();
    let channel = f.host.array_items(array)[0].as_object().unwrap();
    let message = f.ctx.message_new().unwrap();

    let promise = f.ctx.channel_send(channel, message).unwrap();
    f.engine.complete_sends();
    f.ctx.pump();
    assert_eq!(fulfilled(&f.host, promise), Some(Value::Int(1)));

    f.engine.drop_peer(server.native, session);
    f.ctx.pump();
    assert_eq!(
        f.ctx.channel_send(channel, message).unwrap_err(),
        BridgeError::InvalidHandle {
            kind: EntityKind::Channel
        }
    );
    assert_eq!(f.ctx.statistics().completions, 0);
}

#[test]
fn send_on_stopped_socket_resolves_with_zero() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let (_, peer) = connect_peer(&mut f, &server);
    let message = f.ctx.message_new().unwrap();

    f.ctx.socket_stop(server.socket).unwrap();
    f.ctx.pump();
    let promise = f
        .ctx
        .socket_send(server.socket, 0, message, &[peer])
        .unwrap();
    f.engine.complete_sends();
    f.ctx.pump();
    assert_eq!(fulfilled(&f.host, promise), Some(Value::Int(0)));
}

#[test]
fn send_requires_a_message_peer() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let (_, peer) = connect_peer(&mut f, &server);
    assert_eq!(
        f.ctx.session_send(peer, 0, server.socket).unwrap_err(),
        BridgeError::InvalidHandle {
            kind: EntityKind::Message
        }
    );
    assert_eq!(f.ctx.statistics().completions, 0);
}

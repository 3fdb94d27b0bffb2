//! Shared fixtures for the bridge integration tests.

#![allow(dead_code)]

use netbind_bridge::{BridgeConfig, Context};
use netbind_core::{ObjectRef, SessionId, SocketId, Value, KEY_BYTES};
use netbind_test_utils::{MockEngine, MockScriptHost, PromiseState};

pub type Ctx = Context<MockEngine, MockScriptHost>;

/// A context plus test-side handles onto its collaborators.
pub struct Fixture {
    pub ctx: Ctx,
    pub engine: MockEngine,
    pub host: MockScriptHost,
}

pub fn fixture() -> Fixture {
    fixture_with(BridgeConfig::default())
}

pub fn fixture_with(config: BridgeConfig) -> Fixture {
    let engine = MockEngine::new();
    let host = MockScriptHost::new();
    let ctx = Context::new(engine.clone(), host.clone(), config).unwrap();
    Fixture { ctx, engine, host }
}

/// A listener object with one recording function per callback.
pub struct Listener {
    pub object: ObjectRef,
    pub on_connected: ObjectRef,
    pub on_disconnected: ObjectRef,
    pub on_received: ObjectRef,
}

pub fn listener(host: &MockScriptHost) -> Listener {
    let on_connected = host.new_function();
    let on_disconnected = host.new_function();
    let on_received = host.new_function();
    // The plain object consumes the property references; keep our own.
    let object = host.new_plain(vec![
        ("onConnected", Value::Object(dup(host, on_connected))),
        ("onDisconnected", Value::Object(dup(host, on_disconnected))),
        ("onReceived", Value::Object(dup(host, on_received))),
    ]);
    Listener {
        object,
        on_connected,
        on_disconnected,
        on_received,
    }
}

/// Take an extra script reference to `object`.
pub fn dup(host: &MockScriptHost, object: ObjectRef) -> ObjectRef {
    netbind_core::ScriptHost::dup(&mut host.clone(), object)
}

/// A listening socket with `modes` channels and a recording listener.
pub struct Server {
    pub socket: ObjectRef,
    pub native: SocketId,
    pub listener: Listener,
}

pub fn serve(f: &mut Fixture, modes: &[i32]) -> Server {
    let socket = f.ctx.socket_new(modes).unwrap();
    let native = *f.engine.socket_ids().last().unwrap();
    let listener = listener(&f.host);
    f.ctx
        .socket_set_listener(socket, &Value::Object(listener.object))
        .unwrap();
    let promise = f
        .ctx
        .socket_listen(socket, &[1u8; KEY_BYTES], 7, 16, "127.0.0.1:40000")
        .unwrap();
    assert_eq!(
        f.host.promise_state(promise),
        Some(PromiseState::Fulfilled(Value::Undefined))
    );
    f.host.release(promise);
    Server {
        socket,
        native,
        listener,
    }
}

/// Accept one client and return its native session and script peer. The
/// peer is borrowed: the bridge keeps it alive while the session lives.
pub fn connect_peer(f: &mut Fixture, server: &Server) -> (SessionId, ObjectRef) {
    let session = f.engine.accept(server.native);
    f.ctx.pump();
    let calls = f.host.calls(server.listener.on_connected);
    let peer = calls
        .last()
        .and_then(|args| args.first())
        .and_then(Value::as_object)
        .unwrap();
    (session, peer)
}

pub fn fulfilled(host: &MockScriptHost, promise: ObjectRef) -> Option<Value> {
    match host.promise_state(promise) {
        Some(PromiseState::Fulfilled(value)) => Some(value),
        _ => None,
    }
}

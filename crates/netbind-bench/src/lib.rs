//! Benchmark profiles for netbind.
//!
//! - [`mock_context`]: a context over fresh mock collaborators
//! - [`server_profile`]: a listening socket with connected session peers

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use netbind_bridge::{BridgeConfig, Context};
use netbind_core::{ObjectRef, SessionId, SocketId, Value, KEY_BYTES};
use netbind_test_utils::{MockEngine, MockScriptHost};

/// A bench context plus handles onto its collaborators.
pub struct Profile {
    pub ctx: Context<MockEngine, MockScriptHost>,
    pub engine: MockEngine,
    pub host: MockScriptHost,
}

/// A listening server and its connected peers.
pub struct Server {
    pub profile: Profile,
    /// Script peer of the socket.
    pub socket: ObjectRef,
    /// Native socket.
    pub native: SocketId,
    /// Native sessions, in accept order.
    pub sessions: Vec<SessionId>,
    /// Session peers as handed to `onConnected`, in accept order.
    pub peers: Vec<ObjectRef>,
}

/// A context over fresh mocks.
pub fn mock_context(config: BridgeConfig) -> Profile {
    let engine = MockEngine::new();
    let host = MockScriptHost::new();
    let ctx = Context::new(engine.clone(), host.clone(), config)
        .unwrap_or_else(|e| panic!("bench context: {e}"));
    Profile { ctx, engine, host }
}

/// A listening two-channel socket with `peers` sessions connected.
pub fn server_profile(peers: usize) -> Server {
    let mut profile = mock_context(BridgeConfig::default());
    let socket = profile
        .ctx
        .socket_new(&[0, 2])
        .unwrap_or_else(|e| panic!("bench socket: {e}"));

    let on_connected = profile.host.new_function();
    let listener = profile
        .host
        .new_plain(vec![("onConnected", Value::Object(on_connected))]);
    profile
        .ctx
        .socket_set_listener(socket, &Value::Object(listener))
        .unwrap_or_else(|e| panic!("bench listener: {e}"));
    profile.host.release(listener);

    let promise = profile
        .ctx
        .socket_listen(socket, &[7u8; KEY_BYTES], 1, peers.max(1), "127.0.0.1:40000")
        .unwrap_or_else(|e| panic!("bench listen: {e}"));
    profile.host.release(promise);

    let native = profile.engine.socket_ids()[0];
    let sessions = (0..peers).map(|_| profile.engine.accept(native)).collect();
    profile.ctx.pump();
    let peers = profile
        .host
        .calls(on_connected)
        .iter()
        .filter_map(|args| args.first().and_then(Value::as_object))
        .collect();

    Server {
        profile,
        socket,
        native,
        sessions,
        peers,
    }
}

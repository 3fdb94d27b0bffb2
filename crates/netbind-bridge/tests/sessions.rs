//! Integration test: session and channel accessors on live peers.

mod common;

use common::{connect_peer, dup, fixture, serve};
use netbind_bridge::{BridgeError, LinkState};
use netbind_core::{ChannelMode, EntityKind, Rtt, ScriptError, Value};

#[test]
fn session_reports_its_client_id_and_rtt() {
    let mut f = fixture();
    let server = serve(&mut f, &[2]);
    let (session, peer) = connect_peer(&mut f, &server);

    let client_id = session.0 as i64 * 100;
    assert_eq!(f.ctx.session_id(peer).unwrap(), client_id);
    assert_eq!(
        f.ctx.session_rtt(peer).unwrap(),
        Rtt {
            mean: 20_000_000 + client_id as u64,
            variance: 1_000,
        }
    );
}

#[test]
fn disconnect_reports_success_then_detaches_the_peer() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 2]);
    let (_, peer) = connect_peer(&mut f, &server);
    let held = dup(&f.host, peer);

    assert!(f.ctx.session_disconnect(held).unwrap());
    // The proxy stays linked until the engine's cleanup is dispatched.
    assert_eq!(
        f.ctx.link_state(EntityKind::Session, held),
        Some(LinkState::Attached)
    );

    f.ctx.pump();
    assert_eq!(
        f.ctx.link_state(EntityKind::Session, held),
        Some(LinkState::NativeDetached)
    );
    let calls = f.host.calls(server.listener.on_disconnected);
    assert_eq!(calls, vec![vec![Value::Object(peer)]]);
    assert_eq!(f.engine.session_records(), 0);
    assert_eq!(f.engine.channel_records(), 0);

    let err = f.ctx.session_disconnect(held).unwrap_err();
    assert_eq!(
        err,
        BridgeError::InvalidHandle {
            kind: EntityKind::Session
        }
    );
    assert_eq!(ScriptError::from(&err).message, "Invalid native session");

    f.host.release(held);
    f.ctx.pump();
    assert_eq!(f.ctx.statistics().sessions, 0);
}

#[test]
fn session_channel_modes_follow_the_socket() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 1, 2]);
    let (_, peer) = connect_peer(&mut f, &server);

    assert_eq!(
        f.ctx.session_channel_mode(peer, 0).unwrap(),
        ChannelMode::Unreliable
    );
    assert_eq!(
        f.ctx.session_channel_mode(peer, 1).unwrap(),
        ChannelMode::Sequenced
    );
    assert_eq!(
        f.ctx.session_channel_mode(peer, 2).unwrap(),
        ChannelMode::Reliable
    );
}

#[test]
fn session_set_channel_mode_applies_in_range() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 2]);
    let (_, peer) = connect_peer(&mut f, &server);

    assert!(f
        .ctx
        .session_set_channel_mode(peer, 0, ChannelMode::Reliable as i32)
        .unwrap());
    assert_eq!(
        f.ctx.session_channel_mode(peer, 0).unwrap(),
        ChannelMode::Reliable
    );

    // Out of range is reported, not thrown.
    assert!(!f.ctx.session_set_channel_mode(peer, 2, 1).unwrap());
    assert_eq!(
        f.ctx.session_channel_mode(peer, 2).unwrap_err(),
        BridgeError::InvalidArgument("Invalid channel index")
    );

    assert_eq!(
        f.ctx.session_set_channel_mode(peer, 1, 3).unwrap_err(),
        BridgeError::InvalidArgument("Invalid mode")
    );
    assert_eq!(
        f.ctx.session_channel_mode(peer, 1).unwrap(),
        ChannelMode::Reliable
    );
}

#[test]
fn channel_set_mode_is_seen_through_the_session() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 0]);
    let (_, peer) = connect_peer(&mut f, &server);
    let array = f.ctx.session_channels(peer).unwrap();
    let channel = f.host.array_items(array)[1].as_object().unwrap();

    assert_eq!(f.ctx.channel_mode(channel).unwrap(), ChannelMode::Unreliable);
    f.ctx
        .channel_set_mode(channel, ChannelMode::Sequenced as i32)
        .unwrap();
    assert_eq!(f.ctx.channel_mode(channel).unwrap(), ChannelMode::Sequenced);
    assert_eq!(
        f.ctx.session_channel_mode(peer, 1).unwrap(),
        ChannelMode::Sequenced
    );
    assert_eq!(
        f.ctx.session_channel_mode(peer, 0).unwrap(),
        ChannelMode::Unreliable
    );

    assert_eq!(
        f.ctx.channel_set_mode(channel, -1).unwrap_err(),
        BridgeError::InvalidArgument("Invalid mode")
    );
    f.host.release(array);
}

#[test]
fn session_channels_returns_the_cached_array() {
    let mut f = fixture();
    let server = serve(&mut f, &[0, 2]);
    let (_, peer) = connect_peer(&mut f, &server);

    let first = f.ctx.session_channels(peer).unwrap();
    let second = f.ctx.session_channels(peer).unwrap();
    assert_eq!(first, second);
    assert_eq!(f.host.array_items(first).len(), 2);
    assert_eq!(f.ctx.statistics().channels, 2);
    f.host.release(first);
    f.host.release(second);
}

//! Integration test: connect token encoding, random buffers and plugin
//! registration.

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::fixture;
use netbind_bridge::{BridgeError, ConnectToken, TokenRequest};
use netbind_core::{
    NativeError, ScriptError, ScriptErrorKind, CONNECT_TOKEN_BYTES, CONNECT_TOKEN_MAX_ADDRESSES,
    CONNECT_TOKEN_NONCE_BYTES, KEY_BYTES, USER_DATA_BYTES,
};
use std::net::SocketAddr;

const PRIVATE_KEY: [u8; KEY_BYTES] = [1; KEY_BYTES];
const CLIENT_KEY: [u8; KEY_BYTES] = [2; KEY_BYTES];
const SERVER_KEY: [u8; KEY_BYTES] = [3; KEY_BYTES];
const NONCE: [u8; CONNECT_TOKEN_NONCE_BYTES] = [4; CONNECT_TOKEN_NONCE_BYTES];
const ADDRESSES: [&str; 2] = ["127.0.0.1:40000", "[::1]:40001"];

fn request() -> TokenRequest<'static> {
    TokenRequest {
        private_key: &PRIVATE_KEY,
        protocol_id: 0x1122_3344_5566_7788,
        create_timestamp: 1_700_000_000,
        expire_timestamp: 1_700_003_600,
        nonce: &NONCE,
        timeout: 10,
        addresses: &ADDRESSES,
        client_to_server_key: &CLIENT_KEY,
        server_to_client_key: &SERVER_KEY,
        client_id: 123,
        user_data: b"hello",
    }
}

fn range_error(err: &BridgeError) -> ScriptError {
    let script = ScriptError::from(err);
    assert_eq!(script.kind, ScriptErrorKind::RangeError);
    script
}

#[test]
fn encoded_token_carries_every_field() {
    let mut f = fixture();
    let token = f.ctx.token_encode(&request()).unwrap();
    assert_eq!(token.len(), CONNECT_TOKEN_BYTES);
    assert_eq!(token[..8], 0x1122_3344_5566_7788u64.to_le_bytes());
    assert_eq!(token[8..16], 123i64.to_le_bytes());

    let sealed = f.engine.encoded_tokens();
    assert_eq!(sealed.len(), 1);
    let sealed = &sealed[0];
    assert_eq!(sealed.create_timestamp, 1_700_000_000);
    assert_eq!(sealed.expire_timestamp, 1_700_003_600);
    assert_eq!(sealed.timeout, 10);
    assert_eq!(
        sealed.addresses,
        vec![
            "127.0.0.1:40000".parse::<SocketAddr>().unwrap(),
            "[::1]:40001".parse::<SocketAddr>().unwrap(),
        ]
    );
    // User data is zero-padded to its full length.
    assert_eq!(sealed.user_data.len(), USER_DATA_BYTES);
    assert_eq!(&sealed.user_data[..5], b"hello");
    assert!(sealed.user_data[5..].iter().all(|&b| b == 0));
}

#[test]
fn encoded_token_is_accepted_by_connect() {
    let mut f = fixture();
    let token = f.ctx.token_encode(&request()).unwrap();

    let raw = f.ctx.socket_new(&[2]).unwrap();
    let promise = f.ctx.socket_connect(raw, ConnectToken::Bytes(&token)).unwrap();
    f.host.release(promise);

    let text = STANDARD.encode(&token);
    let encoded = f.ctx.socket_new(&[2]).unwrap();
    let promise = f
        .ctx
        .socket_connect(encoded, ConnectToken::Base64(&text))
        .unwrap();
    f.host.release(promise);

    assert_eq!(f.ctx.statistics().running, 2);
}

#[test]
fn byte_lengths_are_range_checked() {
    let mut f = fixture();
    let short_key = [0u8; KEY_BYTES - 1];
    let long_nonce = [0u8; CONNECT_TOKEN_NONCE_BYTES + 1];
    let user_data = [0u8; USER_DATA_BYTES + 1];

    let cases: [(TokenRequest<'_>, &'static str); 5] = [
        (
            TokenRequest {
                private_key: &short_key,
                ..request()
            },
            "Invalid private key length",
        ),
        (
            TokenRequest {
                nonce: &long_nonce,
                ..request()
            },
            "Invalid nonce length",
        ),
        (
            TokenRequest {
                client_to_server_key: &short_key,
                ..request()
            },
            "Invalid client to server key length",
        ),
        (
            TokenRequest {
                server_to_client_key: &short_key,
                ..request()
            },
            "Invalid server to client key length",
        ),
        (
            TokenRequest {
                user_data: &user_data,
                ..request()
            },
            "Invalid user data length",
        ),
    ];
    for (req, message) in cases {
        let err = f.ctx.token_encode(&req).unwrap_err();
        assert_eq!(err, BridgeError::OutOfRange(message));
        assert_eq!(range_error(&err).message, message);
    }
    assert!(f.engine.encoded_tokens().is_empty());
}

#[test]
fn addresses_are_counted_and_parsed() {
    let mut f = fixture();
    let many = vec!["127.0.0.1:1"; CONNECT_TOKEN_MAX_ADDRESSES + 1];
    let err = f
        .ctx
        .token_encode(&TokenRequest {
            addresses: &many,
            ..request()
        })
        .unwrap_err();
    assert_eq!(range_error(&err).message, "Too many addresses");

    let bad = ["127.0.0.1:1", "localhost"];
    let err = f
        .ctx
        .token_encode(&TokenRequest {
            addresses: &bad,
            ..request()
        })
        .unwrap_err();
    assert_eq!(err, BridgeError::InvalidArgument("Invalid address format"));
    assert_eq!(ScriptError::from(&err).kind, ScriptErrorKind::TypeError);

    // The first bad argument wins.
    let short_key = [0u8; 4];
    let err = f
        .ctx
        .token_encode(&TokenRequest {
            addresses: &bad,
            server_to_client_key: &short_key,
            ..request()
        })
        .unwrap_err();
    assert_eq!(err, BridgeError::InvalidArgument("Invalid address format"));

    let full = vec!["127.0.0.1:1"; CONNECT_TOKEN_MAX_ADDRESSES];
    assert!(f
        .ctx
        .token_encode(&TokenRequest {
            addresses: &full,
            ..request()
        })
        .is_ok());
}

#[test]
fn refused_encode_is_reported() {
    let mut f = fixture();
    f.engine.refuse_encode(true);
    let err = f.ctx.token_encode(&request()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::NativeOperationFailed {
            operation: "encode token",
            source: NativeError::Refused { .. },
        }
    ));
    assert_eq!(ScriptError::from(&err).message, "Failed to encode token");

    // The failed attempt gave the scratch arena back.
    f.engine.refuse_encode(false);
    assert!(f.ctx.token_encode(&request()).is_ok());
}

#[test]
fn random_buffers_have_the_requested_length() {
    let mut f = fixture();
    assert!(f.ctx.token_random_buffer(0).unwrap().is_empty());

    let first = f.ctx.token_random_buffer(KEY_BYTES).unwrap();
    let second = f.ctx.token_random_buffer(KEY_BYTES).unwrap();
    assert_eq!(first.len(), KEY_BYTES);
    assert_ne!(first, second);
    assert_eq!(f.ctx.token_random_buffer(37).unwrap().len(), 37);
}

#[test]
fn plugins_register_by_name_or_path() {
    let mut f = fixture();
    f.engine.provide_plugin("jitter");

    assert!(f.ctx.plugin_register_by_name("jitter"));
    assert!(f.ctx.plugin_register_by_path("/usr/lib/netbind/jitter.so"));
    assert!(!f.ctx.plugin_register_by_name("missing"));
    assert!(!f.ctx.plugin_register_by_path("/usr/lib/netbind/missing.so"));
    assert_eq!(f.engine.registered_plugins(), vec!["jitter", "jitter"]);
}

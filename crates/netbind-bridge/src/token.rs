//! Connect tokens, random buffers and plugin registration.
//!
//! None of these touch a proxy. They validate what the script handed
//! over and pass it to the engine.

use crate::context::Context;
use crate::error::BridgeError;
use netbind_core::{
    ConnectTokenParams, NativeEngine, PluginSource, ScriptHost, CONNECT_TOKEN_BYTES,
    CONNECT_TOKEN_MAX_ADDRESSES, CONNECT_TOKEN_NONCE_BYTES, KEY_BYTES, USER_DATA_BYTES,
};
use smallvec::SmallVec;
use std::net::SocketAddr;
use std::path::Path;
use tracing::{debug, warn};

/// Arguments of [`Context::token_encode`] as handed over by the script.
#[derive(Clone, Copy, Debug)]
pub struct TokenRequest<'a> {
    /// Server private key, [`KEY_BYTES`] long.
    pub private_key: &'a [u8],
    /// Protocol identifier shared with the server.
    pub protocol_id: u64,
    /// Creation time, seconds since the Unix epoch.
    pub create_timestamp: i64,
    /// Expiry time, seconds since the Unix epoch.
    pub expire_timestamp: i64,
    /// Private part nonce, [`CONNECT_TOKEN_NONCE_BYTES`] long.
    pub nonce: &'a [u8],
    /// Timeout in seconds; negative disables it.
    pub timeout: i32,
    /// Server addresses as `ip:port` text, at most
    /// [`CONNECT_TOKEN_MAX_ADDRESSES`].
    pub addresses: &'a [&'a str],
    /// Client to server key, [`KEY_BYTES`] long.
    pub client_to_server_key: &'a [u8],
    /// Server to client key, [`KEY_BYTES`] long.
    pub server_to_client_key: &'a [u8],
    /// Identifier of the authenticated client.
    pub client_id: i64,
    /// Up to [`USER_DATA_BYTES`] of application data.
    pub user_data: &'a [u8],
}

fn check_len(bytes: &[u8], len: usize, message: &'static str) -> Result<(), BridgeError> {
    if bytes.len() == len {
        Ok(())
    } else {
        Err(BridgeError::OutOfRange(message))
    }
}

impl<N: NativeEngine, S: ScriptHost> Context<N, S> {
    /// Seal a connect token for a client. The result is
    /// [`CONNECT_TOKEN_BYTES`] long and is accepted by
    /// [`socket_connect`](Self::socket_connect).
    ///
    /// Arguments are checked in order; the first bad one is reported.
    pub fn token_encode(&mut self, request: &TokenRequest<'_>) -> Result<Vec<u8>, BridgeError> {
        check_len(request.private_key, KEY_BYTES, "Invalid private key length")?;
        check_len(
            request.nonce,
            CONNECT_TOKEN_NONCE_BYTES,
            "Invalid nonce length",
        )?;
        if request.addresses.len() > CONNECT_TOKEN_MAX_ADDRESSES {
            return Err(BridgeError::OutOfRange("Too many addresses"));
        }
        let addresses = request
            .addresses
            .iter()
            .map(|text| text.parse::<SocketAddr>())
            .collect::<Result<SmallVec<[SocketAddr; 4]>, _>>()
            .map_err(|_| BridgeError::InvalidArgument("Invalid address format"))?;
        check_len(
            request.client_to_server_key,
            KEY_BYTES,
            "Invalid client to server key length",
        )?;
        check_len(
            request.server_to_client_key,
            KEY_BYTES,
            "Invalid server to client key length",
        )?;
        if request.user_data.len() > USER_DATA_BYTES {
            return Err(BridgeError::OutOfRange("Invalid user data length"));
        }
        let mut user_data = [0u8; USER_DATA_BYTES];
        user_data[..request.user_data.len()].copy_from_slice(request.user_data);

        let params = ConnectTokenParams {
            private_key: request.private_key,
            protocol_id: request.protocol_id,
            create_timestamp: request.create_timestamp,
            expire_timestamp: request.expire_timestamp,
            nonce: request.nonce,
            timeout: request.timeout,
            addresses: &addresses,
            client_to_server_key: request.client_to_server_key,
            server_to_client_key: request.server_to_client_key,
            client_id: request.client_id,
            user_data: &user_data,
        };
        let mut buf = self.scratch.acquire(CONNECT_TOKEN_BYTES)?;
        self.engine
            .encode_connect_token(&params, &mut buf)
            .map_err(BridgeError::native("encode token"))?;
        debug!(client_id = request.client_id, "connect token encoded");
        Ok(buf.to_vec())
    }

    /// `len` random bytes from the engine.
    pub fn token_random_buffer(&mut self, len: usize) -> Result<Vec<u8>, BridgeError> {
        let mut out = Vec::new();
        out.try_reserve_exact(len)
            .map_err(|_| BridgeError::AllocationFailed {
                what: "random buffer",
            })?;
        out.resize(len, 0);
        self.engine.random_bytes(&mut out);
        Ok(out)
    }

    /// Register a plugin the engine resolves by name. Returns whether it
    /// was registered.
    pub fn plugin_register_by_name(&mut self, name: &str) -> bool {
        self.register_plugin(PluginSource::Name(name))
    }

    /// Register a plugin library from `path`. Returns whether it was
    /// registered.
    pub fn plugin_register_by_path(&mut self, path: impl AsRef<Path>) -> bool {
        self.register_plugin(PluginSource::Path(path.as_ref()))
    }

    fn register_plugin(&mut self, source: PluginSource<'_>) -> bool {
        match self.engine.register_plugin(source) {
            Ok(()) => {
                debug!(?source, "plugin registered");
                true
            }
            Err(err) => {
                warn!(?source, %err, "plugin registration failed");
                false
            }
        }
    }
}

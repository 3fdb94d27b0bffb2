//! Send completions: one in-flight send, one promise, one retained message.

use crate::error::BridgeError;
use crate::proxy::{Bindings, ProxyPool};
use netbind_core::{CompletionToken, MessageId, ObjectRef, PromiseCapability, ScriptHost, Value};
use netbind_pool::{Poolable, SlotKey, SlotPool};
use tracing::warn;

/// The settle functions of a pending promise. Both references are owned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Settle {
    pub resolve: ObjectRef,
    pub reject: ObjectRef,
}

impl Settle {
    /// Split a fresh capability into the promise (returned to the
    /// script) and its settle functions.
    pub fn split(capability: PromiseCapability) -> (ObjectRef, Self) {
        (
            capability.promise,
            Self {
                resolve: capability.resolve,
                reject: capability.reject,
            },
        )
    }

    /// Resolve with `value`, then give back both functions.
    pub fn resolve(self, host: &mut dyn ScriptHost, value: Value) {
        self.finish(host, self.resolve, value);
    }

    /// Reject with `value`, then give back both functions.
    pub fn reject(self, host: &mut dyn ScriptHost, value: Value) {
        self.finish(host, self.reject, value);
    }

    /// Give back both functions without settling.
    pub fn discard(self, host: &mut dyn ScriptHost) {
        host.free(self.resolve);
        host.free(self.reject);
    }

    fn finish(self, host: &mut dyn ScriptHost, function: ObjectRef, value: Value) {
        match host.call(function, &Value::Undefined, &[value]) {
            Ok(result) => host.free_value(result),
            Err(err) => warn!(%err, "promise settle function threw"),
        }
        self.discard(host);
    }
}

/// Pooled record correlating one send with its promise.
///
/// Holds one native message reference and one strong reference to the
/// message's script peer from `begin` until the record is released.
#[derive(Default)]
pub(crate) struct CompletionRecord {
    message: Option<MessageId>,
    peer: Option<ObjectRef>,
    settle: Option<Settle>,
}

impl<'a> Poolable<Bindings<'a>> for CompletionRecord {
    fn on_cleanup(&mut self, env: &mut Bindings<'a>) {
        if let Some(message) = self.message.take() {
            env.engine.unref_message(message);
        }
        if let Some(peer) = self.peer.take() {
            env.host.free(peer);
        }
        if let Some(settle) = self.settle.take() {
            settle.discard(env.host);
        }
    }
}

pub(crate) type CompletionPool = SlotPool<CompletionRecord>;

/// A started send: the token to hand the engine, the promise to hand
/// the script.
pub(crate) struct Pending {
    pub token: CompletionToken,
    pub message: MessageId,
    pub promise: ObjectRef,
}

/// Start tracking a send of the message behind `message_key`.
///
/// Fails before any native work if the record pool is exhausted or the
/// message proxy is detached.
pub(crate) fn begin<A>(
    completions: &mut CompletionPool,
    messages: &ProxyPool<MessageId, A>,
    env: &mut Bindings<'_>,
    message_key: SlotKey,
) -> Result<Pending, BridgeError> {
    let proxy = messages.get(message_key);
    let (Some(message), Some(peer)) = (
        proxy.and_then(|p| p.native()),
        proxy.and_then(|p| p.peer()),
    ) else {
        return Err(BridgeError::InvalidHandle {
            kind: netbind_core::EntityKind::Message,
        });
    };

    let key = completions.acquire(env)?;
    let outcome = env
        .engine
        .ref_message(message)
        .map_err(BridgeError::native("reference message"));
    if let Err(e) = outcome {
        completions.release(key, env);
        return Err(e);
    }
    let peer = env.host.dup(peer);
    if let Some(record) = completions.get_mut(key) {
        record.message = Some(message);
        record.peer = Some(peer);
    }

    let capability = match env.host.new_promise() {
        Ok(capability) => capability,
        Err(e) => {
            completions.release(key, env);
            return Err(e.into());
        }
    };
    let (promise, settle) = Settle::split(capability);
    if let Some(record) = completions.get_mut(key) {
        record.settle = Some(settle);
    }
    Ok(Pending {
        token: CompletionToken(key.to_raw()),
        message,
        promise,
    })
}

/// Settle the record behind `token` with the delivery count.
///
/// Zero is a valid count and still resolves. Returns `false` for unknown
/// or already settled tokens.
pub(crate) fn settle(
    completions: &mut CompletionPool,
    env: &mut Bindings<'_>,
    token: CompletionToken,
    message: MessageId,
    count: usize,
) -> bool {
    let key = SlotKey::from_raw(token.0);
    let Some(record) = completions.get_mut(key) else {
        warn!(?token, "completion for unknown send ignored");
        return false;
    };
    if record.message != Some(message) {
        warn!(?token, %message, "completion message mismatch");
    }
    if let Some(settle) = record.settle.take() {
        let count = i32::try_from(count).unwrap_or(i32::MAX);
        settle.resolve(env.host, Value::Int(count));
    }
    completions.release(key, env)
}

//! In-memory [`NativeEngine`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;

use netbind_core::{
    ChannelId, ChannelMode, CompletionToken, ConnectResult, ConnectTokenParams, EventSink,
    ListenParams, MessageId, NativeEngine, NativeEntity, NativeError, NativeEvent, PluginSource,
    Rtt, SendTarget, SessionId, SocketId, SocketState, CONNECT_TOKEN_NONCE_BYTES,
};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

/// Largest payload a mock message accepts.
pub const MESSAGE_CAPACITY: usize = 1200;

/// Seed of the mock's random byte stream.
const RANDOM_SEED: u64 = 0x6e65_7462_696e_64;

struct Socket {
    modes: Vec<ChannelMode>,
    state: SocketState,
    extra: Option<u64>,
    sessions: Vec<SessionId>,
    killed: bool,
}

struct Session {
    client_id: i64,
    channels: Vec<ChannelId>,
    extra: Option<u64>,
    closing: bool,
}

struct Channel {
    mode: ChannelMode,
    extra: Option<u64>,
    closing: bool,
}

#[derive(Default)]
struct Message {
    refs: u32,
    data: Vec<u8>,
    cursor: usize,
}

/// The fields of a token the mock was asked to seal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedToken {
    pub protocol_id: u64,
    pub create_timestamp: i64,
    pub expire_timestamp: i64,
    pub timeout: i32,
    pub addresses: Vec<SocketAddr>,
    pub client_id: i64,
    pub user_data: Vec<u8>,
}

struct InFlight {
    message: MessageId,
    token: CompletionToken,
    count: usize,
}

#[derive(Default)]
struct State {
    sink: Option<EventSink>,
    next_id: u64,
    sockets: HashMap<SocketId, Socket>,
    sessions: HashMap<SessionId, Session>,
    channels: HashMap<ChannelId, Channel>,
    messages: HashMap<MessageId, Message>,
    in_flight: Vec<InFlight>,
    refuse_create: bool,
    refuse_listen: bool,
    refuse_connect: bool,
    refuse_encode: bool,
    encoded: Vec<EncodedToken>,
    rng: Option<ChaCha8Rng>,
    known_plugins: Vec<String>,
    plugins: Vec<String>,
    stop_calls: usize,
    destroyed_sockets: usize,
    shut_down: bool,
    clock: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn post(&self, event: NativeEvent) {
        if let Some(sink) = &self.sink {
            sink.post(event);
        }
    }

    fn unref(&mut self, message: MessageId) {
        if let Some(m) = self.messages.get_mut(&message) {
            m.refs -= 1;
            if m.refs == 0 {
                self.messages.remove(&message);
            }
        }
    }

    /// Close a session: `Disconnected`, then `Cleanup` for each channel
    /// and the session. Records stay readable until their extra is cleared.
    fn close_session(&mut self, socket: SocketId, session: SessionId) {
        let Some(s) = self.sessions.get_mut(&session) else {
            return;
        };
        if s.closing {
            return;
        }
        s.closing = true;
        let channels = s.channels.clone();
        if let Some(sock) = self.sockets.get_mut(&socket) {
            sock.sessions.retain(|&id| id != session);
        }
        self.post(NativeEvent::Disconnected { socket, session });
        for channel in channels {
            if let Some(c) = self.channels.get_mut(&channel) {
                c.closing = true;
            }
            self.post(NativeEvent::Cleanup(NativeEntity::Channel(channel)));
        }
        self.post(NativeEvent::Cleanup(NativeEntity::Session(session)));
        self.reap_session(session);
    }

    /// Drop closing records nobody points at any more.
    fn reap_session(&mut self, session: SessionId) {
        let Some(s) = self.sessions.get(&session) else {
            return;
        };
        if s.closing && s.extra.is_none() {
            self.sessions.remove(&session);
        }
    }

    fn stop(&mut self, socket: SocketId) {
        let sessions = match self.sockets.get(&socket) {
            Some(s) => s.sessions.clone(),
            None => return,
        };
        self.stop_calls += 1;
        for session in sessions {
            self.close_session(socket, session);
        }
        if let Some(s) = self.sockets.get_mut(&socket) {
            s.state = SocketState::Stopped;
        }
    }

    fn session_of(&self, session: SessionId) -> Result<&Session, NativeError> {
        self.sessions
            .get(&session)
            .filter(|s| !s.closing)
            .ok_or(NativeError::UnknownEntity(NativeEntity::Session(session)))
    }

    fn message_of(&mut self, message: MessageId) -> Result<&mut Message, NativeError> {
        self.messages
            .get_mut(&message)
            .ok_or(NativeError::UnknownEntity(NativeEntity::Message(message)))
    }

    fn delivery_count(&self, target: &SendTarget<'_>) -> usize {
        match *target {
            SendTarget::Socket {
                socket,
                channel_index,
                recipients,
            } => {
                let Some(s) = self.sockets.get(&socket) else {
                    return 0;
                };
                if s.state == SocketState::Stopped || channel_index >= s.modes.len() {
                    return 0;
                }
                recipients
                    .iter()
                    .filter(|&&id| s.sessions.contains(&id))
                    .count()
            }
            SendTarget::Session {
                session,
                channel_index,
            } => match self.session_of(session) {
                Ok(s) if channel_index < s.channels.len() => 1,
                _ => 0,
            },
            SendTarget::Channel(channel) => match self.channels.get(&channel) {
                Some(c) if !c.closing => 1,
                _ => 0,
            },
        }
    }
}

/// In-memory native engine. Clones share state.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Rc<RefCell<State>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Failure injection ──────────────────────────────────────

    pub fn refuse_create(&self, refuse: bool) {
        self.state.borrow_mut().refuse_create = refuse;
    }

    pub fn refuse_listen(&self, refuse: bool) {
        self.state.borrow_mut().refuse_listen = refuse;
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.state.borrow_mut().refuse_connect = refuse;
    }

    pub fn refuse_encode(&self, refuse: bool) {
        self.state.borrow_mut().refuse_encode = refuse;
    }

    /// Make a plugin loadable by `name`, or by a path whose file stem is
    /// `name`.
    pub fn provide_plugin(&self, name: &str) {
        self.state.borrow_mut().known_plugins.push(name.to_owned());
    }

    // ── Driving ────────────────────────────────────────────────

    /// A client connects to a listening socket.
    pub fn accept(&self, socket: SocketId) -> SessionId {
        let mut st = self.state.borrow_mut();
        let session = SessionId(st.next_id());
        let modes = st
            .sockets
            .get(&socket)
            .map(|s| s.modes.clone())
            .unwrap_or_default();
        let mut channels = Vec::with_capacity(modes.len());
        for mode in modes {
            let channel = ChannelId(st.next_id());
            st.channels.insert(
                channel,
                Channel {
                    mode,
                    extra: None,
                    closing: false,
                },
            );
            channels.push(channel);
        }
        st.sessions.insert(
            session,
            Session {
                client_id: session.0 as i64 * 100,
                channels,
                extra: None,
                closing: false,
            },
        );
        if let Some(s) = st.sockets.get_mut(&socket) {
            s.sessions.push(session);
        }
        st.post(NativeEvent::Connected { socket, session });
        session
    }

    /// The remote side of `session` goes away.
    pub fn drop_peer(&self, socket: SocketId, session: SessionId) {
        self.state.borrow_mut().close_session(socket, session);
    }

    /// A message arrives from `session`. The event carries the only
    /// reference.
    pub fn deliver(&self, socket: SocketId, session: SessionId, payload: &[u8]) -> MessageId {
        let mut st = self.state.borrow_mut();
        let message = MessageId(st.next_id());
        st.messages.insert(
            message,
            Message {
                refs: 1,
                data: payload.to_vec(),
                cursor: 0,
            },
        );
        st.post(NativeEvent::Received {
            socket,
            session,
            message,
        });
        message
    }

    /// Report the outcome of a pending connect.
    pub fn finish_connect(&self, socket: SocketId, result: ConnectResult) {
        let mut st = self.state.borrow_mut();
        if let Some(s) = st.sockets.get_mut(&socket) {
            s.state = if result == ConnectResult::Success {
                SocketState::Client
            } else {
                SocketState::Stopped
            };
        }
        st.post(NativeEvent::ConnectResult { socket, result });
    }

    /// Post `SendCompleted` for every send in flight. Returns how many.
    pub fn complete_sends(&self) -> usize {
        let mut st = self.state.borrow_mut();
        let done = std::mem::take(&mut st.in_flight);
        for send in &done {
            st.post(NativeEvent::SendCompleted {
                message: send.message,
                token: send.token,
                count: send.count,
            });
            st.unref(send.message);
        }
        done.len()
    }

    /// Destroy a socket behind the bridge's back. The record lingers
    /// until its extra is cleared.
    pub fn kill_socket(&self, socket: SocketId) {
        let mut st = self.state.borrow_mut();
        st.stop(socket);
        let Some(s) = st.sockets.get_mut(&socket) else {
            return;
        };
        s.killed = true;
        if s.extra.is_none() {
            st.sockets.remove(&socket);
            st.destroyed_sockets += 1;
        }
        st.post(NativeEvent::Cleanup(NativeEntity::Socket(socket)));
    }

    pub fn advance_clock(&self, nanos: u64) {
        self.state.borrow_mut().clock += nanos;
    }

    // ── Inspection ─────────────────────────────────────────────

    pub fn socket_ids(&self) -> Vec<SocketId> {
        let mut ids: Vec<_> = self.state.borrow().sockets.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn state_of(&self, socket: SocketId) -> Option<SocketState> {
        self.state.borrow().sockets.get(&socket).map(|s| s.state)
    }

    pub fn extra_of(&self, entity: NativeEntity) -> Option<u64> {
        NativeEngine::extra(self, entity)
    }

    pub fn session_channel_ids(&self, session: SessionId) -> Vec<ChannelId> {
        self.state
            .borrow()
            .sessions
            .get(&session)
            .map(|s| s.channels.clone())
            .unwrap_or_default()
    }

    /// Reference count of a message, `None` once recycled.
    pub fn message_refs(&self, message: MessageId) -> Option<u32> {
        self.state.borrow().messages.get(&message).map(|m| m.refs)
    }

    pub fn live_messages(&self) -> usize {
        self.state.borrow().messages.len()
    }

    /// Session records still held, including ones waiting for their
    /// extra to be cleared.
    pub fn session_records(&self) -> usize {
        self.state.borrow().sessions.len()
    }

    pub fn channel_records(&self) -> usize {
        self.state.borrow().channels.len()
    }

    /// Tokens sealed so far, oldest first.
    pub fn encoded_tokens(&self) -> Vec<EncodedToken> {
        self.state.borrow().encoded.clone()
    }

    /// Names of registered plugins, in registration order.
    pub fn registered_plugins(&self) -> Vec<String> {
        self.state.borrow().plugins.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.state.borrow().in_flight.len()
    }

    pub fn stop_calls(&self) -> usize {
        self.state.borrow().stop_calls
    }

    pub fn destroyed_sockets(&self) -> usize {
        self.state.borrow().destroyed_sockets
    }

    pub fn is_attached(&self) -> bool {
        self.state.borrow().sink.is_some()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }
}

impl NativeEngine for MockEngine {
    fn attach(&mut self, sink: EventSink) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        if st.sink.is_some() {
            return Err(NativeError::Refused {
                reason: "already attached".into(),
            });
        }
        st.sink = Some(sink);
        st.shut_down = false;
        Ok(())
    }

    fn shutdown(&mut self) {
        let mut st = self.state.borrow_mut();
        st.sink = None;
        st.sockets.clear();
        st.sessions.clear();
        st.channels.clear();
        for send in std::mem::take(&mut st.in_flight) {
            st.unref(send.message);
        }
        st.shut_down = true;
    }

    fn create_socket(&mut self, modes: &[ChannelMode]) -> Result<SocketId, NativeError> {
        let mut st = self.state.borrow_mut();
        if st.refuse_create {
            return Err(NativeError::AllocationFailed);
        }
        let socket = SocketId(st.next_id());
        st.sockets.insert(
            socket,
            Socket {
                modes: modes.to_vec(),
                state: SocketState::Stopped,
                extra: None,
                sessions: Vec::new(),
                killed: false,
            },
        );
        Ok(socket)
    }

    fn destroy_socket(&mut self, socket: SocketId) {
        let mut st = self.state.borrow_mut();
        if !st.sockets.contains_key(&socket) {
            return;
        }
        if st.sockets.get(&socket).map(|s| s.state) != Some(SocketState::Stopped) {
            st.stop(socket);
        }
        st.sockets.remove(&socket);
        st.destroyed_sockets += 1;
    }

    fn listen(&mut self, socket: SocketId, params: &ListenParams<'_>) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        let refuse = st.refuse_listen;
        let s = st
            .sockets
            .get_mut(&socket)
            .ok_or(NativeError::UnknownEntity(NativeEntity::Socket(socket)))?;
        if refuse || s.state != SocketState::Stopped || params.max_clients == 0 {
            return Err(NativeError::Refused {
                reason: "cannot listen".into(),
            });
        }
        s.state = SocketState::Server;
        Ok(())
    }

    fn connect(&mut self, socket: SocketId, token: &[u8]) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        let refuse = st.refuse_connect;
        let s = st
            .sockets
            .get_mut(&socket)
            .ok_or(NativeError::UnknownEntity(NativeEntity::Socket(socket)))?;
        if refuse || s.state != SocketState::Stopped || token.is_empty() {
            return Err(NativeError::Refused {
                reason: "cannot connect".into(),
            });
        }
        s.state = SocketState::Connecting;
        Ok(())
    }

    fn stop(&mut self, socket: SocketId) {
        self.state.borrow_mut().stop(socket);
    }

    fn socket_state(&self, socket: SocketId) -> SocketState {
        self.state_of(socket).unwrap_or_default()
    }

    fn time(&self, socket: SocketId) -> Result<u64, NativeError> {
        let st = self.state.borrow();
        if st.sockets.contains_key(&socket) {
            Ok(st.clock)
        } else {
            Err(NativeError::UnknownEntity(NativeEntity::Socket(socket)))
        }
    }

    fn send(&mut self, target: SendTarget<'_>, message: MessageId, token: CompletionToken) {
        let mut st = self.state.borrow_mut();
        let count = st.delivery_count(&target);
        // The engine holds its own reference while the send is in flight.
        if let Some(m) = st.messages.get_mut(&message) {
            m.refs += 1;
        }
        st.in_flight.push(InFlight {
            message,
            token,
            count,
        });
    }

    fn set_extra(&mut self, entity: NativeEntity, extra: Option<u64>) {
        let mut st = self.state.borrow_mut();
        match entity {
            NativeEntity::Socket(id) => {
                let reap = match st.sockets.get_mut(&id) {
                    Some(s) => {
                        s.extra = extra;
                        s.killed && extra.is_none()
                    }
                    None => false,
                };
                if reap {
                    st.sockets.remove(&id);
                    st.destroyed_sockets += 1;
                }
            }
            NativeEntity::Session(id) => {
                if let Some(s) = st.sessions.get_mut(&id) {
                    s.extra = extra;
                }
                st.reap_session(id);
            }
            NativeEntity::Channel(id) => {
                let reap = match st.channels.get_mut(&id) {
                    Some(c) => {
                        c.extra = extra;
                        c.closing && extra.is_none()
                    }
                    None => false,
                };
                if reap {
                    st.channels.remove(&id);
                }
            }
            NativeEntity::Message(_) => {}
        }
    }

    fn extra(&self, entity: NativeEntity) -> Option<u64> {
        let st = self.state.borrow();
        match entity {
            NativeEntity::Socket(id) => st.sockets.get(&id)?.extra,
            NativeEntity::Session(id) => st.sessions.get(&id)?.extra,
            NativeEntity::Channel(id) => st.channels.get(&id)?.extra,
            NativeEntity::Message(_) => None,
        }
    }

    fn session_client_id(&self, session: SessionId) -> Result<i64, NativeError> {
        Ok(self.state.borrow().session_of(session)?.client_id)
    }

    fn session_disconnect(&mut self, session: SessionId) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        st.session_of(session)?;
        let socket = st
            .sockets
            .iter()
            .find(|(_, s)| s.sessions.contains(&session))
            .map(|(&id, _)| id)
            .ok_or(NativeError::UnknownEntity(NativeEntity::Session(session)))?;
        st.close_session(socket, session);
        Ok(())
    }

    fn session_rtt(&self, session: SessionId) -> Result<Rtt, NativeError> {
        let st = self.state.borrow();
        let s = st.session_of(session)?;
        Ok(Rtt {
            mean: 20_000_000 + s.client_id as u64,
            variance: 1_000,
        })
    }

    fn session_channels(
        &self,
        session: SessionId,
    ) -> Result<SmallVec<[ChannelId; 4]>, NativeError> {
        let st = self.state.borrow();
        Ok(st.session_of(session)?.channels.iter().copied().collect())
    }

    fn channel_mode(&self, channel: ChannelId) -> Result<ChannelMode, NativeError> {
        self.state
            .borrow()
            .channels
            .get(&channel)
            .filter(|c| !c.closing)
            .map(|c| c.mode)
            .ok_or(NativeError::UnknownEntity(NativeEntity::Channel(channel)))
    }

    fn set_channel_mode(
        &mut self,
        channel: ChannelId,
        mode: ChannelMode,
    ) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        let c = st
            .channels
            .get_mut(&channel)
            .filter(|c| !c.closing)
            .ok_or(NativeError::UnknownEntity(NativeEntity::Channel(channel)))?;
        c.mode = mode;
        Ok(())
    }

    /// Mock layout: protocol id, client id and expiry (little-endian),
    /// then the nonce. The rest stays zero.
    fn encode_connect_token(
        &mut self,
        params: &ConnectTokenParams<'_>,
        out: &mut [u8],
    ) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        if st.refuse_encode {
            return Err(NativeError::Refused {
                reason: "cannot encode token".into(),
            });
        }
        out.fill(0);
        out[0..8].copy_from_slice(&params.protocol_id.to_le_bytes());
        out[8..16].copy_from_slice(&params.client_id.to_le_bytes());
        out[16..24].copy_from_slice(&params.expire_timestamp.to_le_bytes());
        out[24..24 + CONNECT_TOKEN_NONCE_BYTES].copy_from_slice(params.nonce);
        st.encoded.push(EncodedToken {
            protocol_id: params.protocol_id,
            create_timestamp: params.create_timestamp,
            expire_timestamp: params.expire_timestamp,
            timeout: params.timeout,
            addresses: params.addresses.to_vec(),
            client_id: params.client_id,
            user_data: params.user_data.to_vec(),
        });
        Ok(())
    }

    fn random_bytes(&mut self, buf: &mut [u8]) {
        // Seeded, so every run sees the same stream.
        self.state
            .borrow_mut()
            .rng
            .get_or_insert_with(|| ChaCha8Rng::seed_from_u64(RANDOM_SEED))
            .fill_bytes(buf);
    }

    fn register_plugin(&mut self, source: PluginSource<'_>) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        let name = match source {
            PluginSource::Name(name) => Some(name),
            PluginSource::Path(path) => path.file_stem().and_then(|stem| stem.to_str()),
        };
        let Some(name) = name.filter(|n| st.known_plugins.iter().any(|k| k == n)) else {
            return Err(NativeError::Refused {
                reason: "plugin not found".into(),
            });
        };
        let name = name.to_owned();
        st.plugins.push(name);
        Ok(())
    }

    fn acquire_message(&mut self) -> Result<MessageId, NativeError> {
        let mut st = self.state.borrow_mut();
        let message = MessageId(st.next_id());
        st.messages.insert(
            message,
            Message {
                refs: 1,
                ..Message::default()
            },
        );
        Ok(message)
    }

    fn ref_message(&mut self, message: MessageId) -> Result<(), NativeError> {
        self.state.borrow_mut().message_of(message)?.refs += 1;
        Ok(())
    }

    fn unref_message(&mut self, message: MessageId) {
        self.state.borrow_mut().unref(message);
    }

    fn message_size(&self, message: MessageId) -> Result<usize, NativeError> {
        self.state
            .borrow()
            .messages
            .get(&message)
            .map(|m| m.data.len())
            .ok_or(NativeError::UnknownEntity(NativeEntity::Message(message)))
    }

    fn message_reset(&mut self, message: MessageId) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        let m = st.message_of(message)?;
        m.data.clear();
        m.cursor = 0;
        Ok(())
    }

    fn message_read(&mut self, message: MessageId, buf: &mut [u8]) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        let m = st.message_of(message)?;
        let end = m.cursor + buf.len();
        if end > m.data.len() {
            return Err(NativeError::Underflow);
        }
        buf.copy_from_slice(&m.data[m.cursor..end]);
        m.cursor = end;
        Ok(())
    }

    fn message_write(&mut self, message: MessageId, bytes: &[u8]) -> Result<(), NativeError> {
        let mut st = self.state.borrow_mut();
        let m = st.message_of(message)?;
        if m.data.len() + bytes.len() > MESSAGE_CAPACITY {
            return Err(NativeError::Overflow);
        }
        m.data.extend_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbind_core::event_channel;

    fn attached() -> (MockEngine, netbind_core::EventQueue) {
        let mut engine = MockEngine::new();
        let (sink, queue) = event_channel();
        engine.attach(sink).unwrap();
        (engine, queue)
    }

    #[test]
    fn closing_session_stays_readable_until_extra_cleared() {
        let (mut engine, queue) = attached();
        let socket = engine.create_socket(&[ChannelMode::Reliable]).unwrap();
        let session = engine.accept(socket);
        engine.set_extra(NativeEntity::Session(session), Some(7));

        engine.drop_peer(socket, session);
        assert_eq!(engine.extra(NativeEntity::Session(session)), Some(7));
        assert!(engine.session_client_id(session).is_err());

        engine.set_extra(NativeEntity::Session(session), None);
        assert_eq!(engine.session_records(), 0);
        // Connected, Disconnected, one channel cleanup, session cleanup.
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn send_holds_a_reference_until_completion() {
        let (mut engine, _queue) = attached();
        let message = engine.acquire_message().unwrap();
        engine.send(SendTarget::Channel(ChannelId(999)), message, CompletionToken(1));
        assert_eq!(engine.message_refs(message), Some(2));
        engine.unref_message(message);
        assert_eq!(engine.complete_sends(), 1);
        assert_eq!(engine.message_refs(message), None);
    }

    #[test]
    fn random_bytes_differ_between_calls() {
        let mut engine = MockEngine::new();
        let mut first = [0u8; 13];
        let mut second = [0u8; 13];
        engine.random_bytes(&mut first);
        engine.random_bytes(&mut second);
        assert_ne!(first, [0u8; 13]);
        assert_ne!(first, second);
    }

    #[test]
    fn plugins_resolve_by_name_or_file_stem() {
        let mut engine = MockEngine::new();
        engine.provide_plugin("lag");
        assert!(engine.register_plugin(PluginSource::Name("lag")).is_ok());
        assert!(engine
            .register_plugin(PluginSource::Path(std::path::Path::new("/opt/plugins/lag.so")))
            .is_ok());
        assert!(engine.register_plugin(PluginSource::Name("loss")).is_err());
        assert_eq!(engine.registered_plugins(), vec!["lag", "lag"]);
    }

    #[test]
    fn read_past_payload_underflows() {
        let (mut engine, _queue) = attached();
        let message = engine.acquire_message().unwrap();
        engine.message_write(message, &[1, 2]).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(
            engine.message_read(message, &mut buf),
            Err(NativeError::Underflow)
        );
    }
}

//! Events flowing from the collaborators back into the bridge.
//!
//! The native engine and the script host never call into the bridge
//! directly. They post typed events onto unbounded queues, and the bridge
//! drains those queues on its own thread. An engine is free to post from
//! worker threads; nothing touches script state until the bridge pumps.

use crate::id::{CompletionToken, EntityKind, MessageId, NativeEntity, SessionId, SocketId};
use crate::value::ConnectResult;
use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// A notification posted by the native engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeEvent {
    /// A remote peer connected to a socket.
    Connected {
        /// The socket the peer connected to.
        socket: SocketId,
        /// The newly created session.
        session: SessionId,
    },
    /// A remote peer disconnected. The session's `Cleanup` follows.
    Disconnected {
        /// The socket the peer was connected to.
        socket: SocketId,
        /// The departing session.
        session: SessionId,
    },
    /// A message arrived from a peer.
    ///
    /// The event carries one message reference, which the consumer must
    /// release once it is done with the event.
    Received {
        /// Receiving socket.
        socket: SocketId,
        /// Sending session.
        session: SessionId,
        /// The payload.
        message: MessageId,
    },
    /// A client connect attempt finished.
    ConnectResult {
        /// The connecting socket.
        socket: SocketId,
        /// The outcome.
        result: ConnectResult,
    },
    /// A send finished. `count` is the number of recipients the message
    /// was delivered to, zero when the send could not be performed.
    SendCompleted {
        /// The sent message.
        message: MessageId,
        /// The token passed with the send.
        token: CompletionToken,
        /// Number of recipients reached.
        count: usize,
    },
    /// The engine is destroying an entity out of band.
    ///
    /// The entity's extra slot stays readable until the consumer clears
    /// it with [`NativeEngine::set_extra`](crate::NativeEngine::set_extra).
    Cleanup(NativeEntity),
}

/// Sending half of the native event queue, owned by the engine.
#[derive(Clone, Debug)]
pub struct EventSink(Sender<NativeEvent>);

impl EventSink {
    /// Post an event. Returns `false` if the bridge is gone.
    pub fn post(&self, event: NativeEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// Receiving half of the native event queue, owned by the bridge.
#[derive(Debug)]
pub struct EventQueue(Receiver<NativeEvent>);

impl EventQueue {
    /// Take the next queued event without blocking.
    pub fn try_next(&self) -> Option<NativeEvent> {
        match self.0.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no events are queued.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Create a connected native event queue.
pub fn event_channel() -> (EventSink, EventQueue) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (EventSink(tx), EventQueue(rx))
}

/// Notification that the script host collected an object carrying an
/// opaque key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Finalization {
    /// Class of the collected object.
    pub kind: EntityKind,
    /// The opaque key that was attached to it.
    pub key: u64,
}

/// Sending half of the finalization queue, owned by the script host.
#[derive(Clone, Debug)]
pub struct FinalizerSink(Sender<Finalization>);

impl FinalizerSink {
    /// Report a finalized object. Returns `false` if the bridge is gone.
    pub fn post(&self, finalization: Finalization) -> bool {
        self.0.send(finalization).is_ok()
    }
}

/// Receiving half of the finalization queue, owned by the bridge.
#[derive(Debug)]
pub struct FinalizerQueue(Receiver<Finalization>);

impl FinalizerQueue {
    /// Take the next queued finalization without blocking.
    pub fn try_next(&self) -> Option<Finalization> {
        self.0.try_recv().ok()
    }

    /// Number of queued finalizations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no finalizations are queued.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Create a connected finalization queue.
pub fn finalizer_channel() -> (FinalizerSink, FinalizerQueue) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (FinalizerSink(tx), FinalizerQueue(rx))
}

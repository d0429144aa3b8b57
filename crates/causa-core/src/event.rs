//! Event and message definitions
//!
//! Events are the entries of a process history. Envelopes and direct
//! messages are what processes hand to the bus; they carry immutable
//! timestamp snapshots, never references to a clock.
//!
//! Everything here is generic over the timestamp kind `Ts` and the
//! application payload `T`.

use std::fmt;

use crate::{ProcessId, Sequence};

/// Event type classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Point-to-point send
    Send,
    /// Point-to-point receive
    Receive,
    /// The sender's own record of a broadcast
    Broadcast,
    /// FIFO delivery of another process's broadcast
    Deliver,
    /// Internal step with no communication
    Local,
}

impl EventKind {
    /// Did the event originate at the recording process?
    pub fn is_outgoing(self) -> bool {
        matches!(self, EventKind::Send | EventKind::Broadcast)
    }

    /// Did the event fold in a remote timestamp?
    pub fn is_incoming(self) -> bool {
        matches!(self, EventKind::Receive | EventKind::Deliver)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Send => "SEND",
            EventKind::Receive => "RECEIVE",
            EventKind::Broadcast => "BROADCAST",
            EventKind::Deliver => "DELIVER",
            EventKind::Local => "LOCAL",
        };
        f.write_str(label)
    }
}

/// History entry of a single process
#[derive(Clone, Debug, PartialEq)]
pub struct Event<Ts, T> {
    /// Process whose history holds the event
    pub process: ProcessId,
    /// Event type
    pub kind: EventKind,
    /// Local clock snapshot taken at the event
    pub timestamp: Ts,
    /// Application payload
    pub payload: T,
    /// Other end of a send, receive or delivery
    pub peer: Option<ProcessId>,
    /// Broadcast sequence number (broadcast and deliver only)
    pub sequence: Option<Sequence>,
}

impl<Ts, T> Event<Ts, T> {
    /// Create a new event
    pub fn new(process: ProcessId, kind: EventKind, timestamp: Ts, payload: T) -> Self {
        Event {
            process,
            kind,
            timestamp,
            payload,
            peer: None,
            sequence: None,
        }
    }

    /// Set the other end of the exchange
    pub fn with_peer(mut self, peer: ProcessId) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Set broadcast sequence number
    pub fn with_sequence(mut self, sequence: Sequence) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Process that produced the payload
    pub fn origin(&self) -> &ProcessId {
        match self.kind {
            EventKind::Receive | EventKind::Deliver => self.peer.as_ref().unwrap_or(&self.process),
            _ => &self.process,
        }
    }
}

/// Broadcast envelope - created at send time, consumed once at delivery
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope<Ts, T> {
    pub sender: ProcessId,
    pub sequence: Sequence,
    pub payload: T,
    /// Sender's clock snapshot at broadcast
    pub timestamp: Ts,
}

impl<Ts, T> Envelope<Ts, T> {
    pub fn new(sender: ProcessId, sequence: Sequence, payload: T, timestamp: Ts) -> Self {
        Envelope {
            sender,
            sequence,
            payload,
            timestamp,
        }
    }
}

/// Addressed point-to-point message
#[derive(Clone, Debug, PartialEq)]
pub struct DirectMessage<Ts, T> {
    pub sender: ProcessId,
    pub receiver: ProcessId,
    pub payload: T,
    /// Sender's clock snapshot at send
    pub timestamp: Ts,
}

impl<Ts, T> DirectMessage<Ts, T> {
    pub fn new(sender: ProcessId, receiver: ProcessId, payload: T, timestamp: Ts) -> Self {
        DirectMessage {
            sender,
            receiver,
            payload,
            timestamp,
        }
    }
}

/// Anything the bus can carry
#[derive(Clone, Debug, PartialEq)]
pub enum Packet<Ts, T> {
    Broadcast(Envelope<Ts, T>),
    Direct(DirectMessage<Ts, T>),
}

impl<Ts, T> Packet<Ts, T> {
    pub fn sender(&self) -> &ProcessId {
        match self {
            Packet::Broadcast(env) => &env.sender,
            Packet::Direct(msg) => &msg.sender,
        }
    }

    pub fn timestamp(&self) -> &Ts {
        match self {
            Packet::Broadcast(env) => &env.timestamp,
            Packet::Direct(msg) => &msg.timestamp,
        }
    }

    pub fn payload(&self) -> &T {
        match self {
            Packet::Broadcast(env) => &env.payload,
            Packet::Direct(msg) => &msg.payload,
        }
    }

    /// Broadcast sequence number, if any
    pub fn sequence(&self) -> Option<Sequence> {
        match self {
            Packet::Broadcast(env) => Some(env.sequence),
            Packet::Direct(_) => None,
        }
    }
}

impl<Ts, T> From<Envelope<Ts, T>> for Packet<Ts, T> {
    fn from(env: Envelope<Ts, T>) -> Self {
        Packet::Broadcast(env)
    }
}

impl<Ts, T> From<DirectMessage<Ts, T>> for Packet<Ts, T> {
    fn from(msg: DirectMessage<Ts, T>) -> Self {
        Packet::Direct(msg)
    }
}

//! Simulated process - exclusive owner of its clock, delivery buffer and
//! history

use causa_clock::{LogicalClock, ProcessRegistry};
use causa_core::{
    CausalError, CausalResult, DirectMessage, Envelope, Event, EventKind, Packet, ProcessId,
    Sequence,
};
use causa_fifo::FifoBroadcast;

use crate::{Observers, SystemConfig};

/// What happened to an incoming packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Receipt {
    /// Direct message merged and recorded
    Received,
    /// Broadcast envelopes delivered (the arriving one plus drained successors)
    Delivered(usize),
    /// Broadcast envelope held behind a gap
    Buffered,
}

/// Read-only view over a process history.
///
/// Iterating does not copy events, and the view can be iterated any number
/// of times.
#[derive(Debug)]
pub struct History<'a, Ts, T> {
    events: &'a [Event<Ts, T>],
}

impl<'a, Ts, T> History<'a, Ts, T> {
    pub fn iter(&self) -> std::slice::Iter<'a, Event<Ts, T>> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Event<Ts, T>> {
        self.events.get(index)
    }

    pub fn last(&self) -> Option<&'a Event<Ts, T>> {
        self.events.last()
    }

    pub fn as_slice(&self) -> &'a [Event<Ts, T>] {
        self.events
    }

    /// Events of one kind, in history order
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &'a Event<Ts, T>> + 'a {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

impl<'a, Ts, T> Clone for History<'a, Ts, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, Ts, T> Copy for History<'a, Ts, T> {}

impl<'a, Ts, T> IntoIterator for History<'a, Ts, T> {
    type Item = &'a Event<Ts, T>;
    type IntoIter = std::slice::Iter<'a, Event<Ts, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// A simulated process
pub struct Process<C: LogicalClock, T> {
    id: ProcessId,
    clock: C,
    fifo: FifoBroadcast<C::Timestamp, T>,
    /// Append-only
    history: Vec<Event<C::Timestamp, T>>,
    observers: Observers<C::Timestamp, T>,
}

impl<C: LogicalClock, T: Clone> Process<C, T> {
    /// Create a process whose clock is sized by the registry
    pub fn new(
        id: ProcessId,
        registry: &ProcessRegistry,
        config: &SystemConfig,
        observers: Observers<C::Timestamp, T>,
    ) -> Self {
        Process {
            clock: C::for_process(id.clone(), registry),
            fifo: FifoBroadcast::with_capacity(id.clone(), config.max_pending_per_sender),
            history: Vec::new(),
            observers,
            id,
        }
    }

    /// Internal step: tick and record
    pub fn local_event(&mut self, payload: T) -> Event<C::Timestamp, T> {
        let timestamp = self.clock.tick();
        let event = Event::new(self.id.clone(), EventKind::Local, timestamp, payload);
        self.record(event.clone());
        event
    }

    /// Point-to-point send: tick, record the Send event, build the message
    pub fn send(
        &mut self,
        to: ProcessId,
        payload: T,
    ) -> (Event<C::Timestamp, T>, DirectMessage<C::Timestamp, T>) {
        let timestamp = self.clock.tick();
        let message = DirectMessage::new(self.id.clone(), to.clone(), payload.clone(), timestamp.clone());
        let event = Event::new(self.id.clone(), EventKind::Send, timestamp, payload).with_peer(to);
        self.record(event.clone());
        (event, message)
    }

    /// FIFO broadcast: tick, assign the next sequence, record the sender's
    /// own Broadcast event before anyone else can see the envelope
    pub fn broadcast(&mut self, payload: T) -> Envelope<C::Timestamp, T> {
        let timestamp = self.clock.tick();
        let envelope = self.fifo.broadcast(payload.clone(), timestamp.clone());
        let event = Event::new(self.id.clone(), EventKind::Broadcast, timestamp, payload)
            .with_sequence(envelope.sequence);
        self.record(event);
        envelope
    }

    /// Handle any packet addressed to this process
    pub fn handle(&mut self, packet: Packet<C::Timestamp, T>) -> CausalResult<Receipt> {
        match packet {
            Packet::Direct(message) => self.receive_direct(message),
            Packet::Broadcast(envelope) => self.receive_broadcast(envelope),
        }
    }

    /// Merge a direct message's timestamp and record the Receive event
    pub fn receive_direct(&mut self, message: DirectMessage<C::Timestamp, T>) -> CausalResult<Receipt> {
        if message.receiver != self.id {
            return Err(CausalError::MisroutedMessage {
                intended: message.receiver,
                actual: self.id.clone(),
            });
        }

        let timestamp = self.clock.merge_on_receive(&message.timestamp)?;
        let event = Event::new(self.id.clone(), EventKind::Receive, timestamp, message.payload)
            .with_peer(message.sender);
        self.record(event);
        Ok(Receipt::Received)
    }

    /// Run a broadcast envelope through the delivery buffer and deliver
    /// whatever it releases, in order
    pub fn receive_broadcast(&mut self, envelope: Envelope<C::Timestamp, T>) -> CausalResult<Receipt> {
        // Reject protocol violations before they can sit in the buffer
        self.clock.admits(&envelope.timestamp)?;

        let ready = self.fifo.on_receive(envelope)?;
        if ready.is_empty() {
            return Ok(Receipt::Buffered);
        }

        let delivered = ready.len();
        for envelope in ready {
            self.deliver(envelope)?;
        }
        Ok(Receipt::Delivered(delivered))
    }

    fn deliver(&mut self, envelope: Envelope<C::Timestamp, T>) -> CausalResult<()> {
        let timestamp = self.clock.merge_on_receive(&envelope.timestamp)?;
        let event = Event::new(self.id.clone(), EventKind::Deliver, timestamp, envelope.payload)
            .with_peer(envelope.sender)
            .with_sequence(envelope.sequence);
        self.record(event);
        Ok(())
    }

    fn record(&mut self, event: Event<C::Timestamp, T>) {
        self.history.push(event);
        if let Some(event) = self.history.last() {
            self.observers.notify(&self.id, event);
        }
    }
}

impl<C: LogicalClock, T> Process<C, T> {
    /// A process joined the registry after this one was created
    pub fn observe_process(&mut self, id: &ProcessId) {
        self.clock.observe_process(id);
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Current clock snapshot
    pub fn timestamp(&self) -> C::Timestamp {
        self.clock.now()
    }

    pub fn history(&self) -> History<'_, C::Timestamp, T> {
        History {
            events: &self.history,
        }
    }

    pub fn fifo(&self) -> &FifoBroadcast<C::Timestamp, T> {
        &self.fifo
    }

    /// Next sequence this process expects from `sender`
    pub fn expected_next(&self, sender: &ProcessId) -> Sequence {
        self.fifo.buffer().expected_next(sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causa_clock::{ScalarClock, VectorClock};
    use causa_core::{ScalarTimestamp, VectorTimestamp};

    fn registry(ids: &[&str]) -> ProcessRegistry {
        let mut registry = ProcessRegistry::new();
        for id in ids {
            registry.register(ProcessId::new(id)).unwrap();
        }
        registry
    }

    fn process<C: LogicalClock>(id: &str, reg: &ProcessRegistry) -> Process<C, &'static str> {
        Process::new(ProcessId::new(id), reg, &SystemConfig::default(), Observers::new())
    }

    #[test]
    fn test_send_then_receive_scalar() {
        let reg = registry(&["P1", "P2"]);
        let mut p1 = process::<ScalarClock>("P1", &reg);
        let mut p2 = process::<ScalarClock>("P2", &reg);

        p2.local_event("warmup");
        p2.local_event("warmup");
        let (sent, message) = p1.send(ProcessId::new("P2"), "hello");
        assert_eq!(sent.timestamp, ScalarTimestamp::new(1));

        assert_eq!(p2.receive_direct(message).unwrap(), Receipt::Received);
        let received = p2.history().last().unwrap();
        assert_eq!(received.kind, EventKind::Receive);
        assert_eq!(received.timestamp, ScalarTimestamp::new(3));
        assert_eq!(received.peer, Some(ProcessId::new("P1")));
    }

    #[test]
    fn test_misrouted_direct_message() {
        let reg = registry(&["P1", "P2", "P3"]);
        let mut p1 = process::<ScalarClock>("P1", &reg);
        let mut p3 = process::<ScalarClock>("P3", &reg);

        let (_, message) = p1.send(ProcessId::new("P2"), "for P2");
        let err = p3.receive_direct(message).unwrap_err();
        assert_eq!(
            err,
            CausalError::MisroutedMessage {
                intended: ProcessId::new("P2"),
                actual: ProcessId::new("P3"),
            }
        );
        assert!(p3.history().is_empty());
    }

    #[test]
    fn test_broadcast_recorded_before_delivery() {
        let reg = registry(&["P1", "P2"]);
        let mut p1 = process::<VectorClock>("P1", &reg);

        let envelope = p1.broadcast("A");
        assert_eq!(envelope.sequence, Sequence::FIRST);

        let own = p1.history().last().unwrap();
        assert_eq!(own.kind, EventKind::Broadcast);
        assert_eq!(own.sequence, Some(Sequence::FIRST));
        assert_eq!(own.timestamp, envelope.timestamp);
    }

    #[test]
    fn test_buffered_envelope_with_unknown_process_is_rejected() {
        let reg = registry(&["P1", "P2"]);
        let mut p2 = process::<VectorClock>("P2", &reg);

        let rogue = Envelope::new(
            ProcessId::new("P1"),
            Sequence::new(2),
            "rogue",
            VectorTimestamp::from_entries([(ProcessId::new("P9"), 1)]),
        );
        assert_eq!(
            p2.receive_broadcast(rogue).unwrap_err(),
            CausalError::UnknownProcess(ProcessId::new("P9"))
        );
        assert_eq!(p2.fifo().buffer().pending_total(), 0);
    }

    #[test]
    fn test_history_is_restartable() {
        let reg = registry(&["P1"]);
        let mut p1 = process::<ScalarClock>("P1", &reg);
        p1.local_event("a");
        p1.local_event("b");

        let history = p1.history();
        let first: Vec<_> = history.iter().map(|e| e.payload).collect();
        let second: Vec<_> = history.into_iter().map(|e| e.payload).collect();
        assert_eq!(first, second);
        assert_eq!(history.of_kind(EventKind::Local).count(), 2);
    }
}

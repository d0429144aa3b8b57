//! FIFO broadcast engine - one per process

use causa_core::{CausalResult, Envelope, ProcessId, Sequence};

use crate::DeliveryBuffer;

/// Per-process FIFO broadcast state: the outgoing sequence counter and the
/// incoming delivery buffer. Owned exclusively by its process.
#[derive(Clone, Debug)]
pub struct FifoBroadcast<Ts, T> {
    owner: ProcessId,
    /// Last sequence assigned to an outgoing broadcast (0 = none yet)
    last_sequence: u64,
    buffer: DeliveryBuffer<Ts, T>,
}

impl<Ts, T> FifoBroadcast<Ts, T> {
    /// Create an engine with an unbounded delivery buffer
    pub fn new(owner: ProcessId) -> Self {
        Self::with_capacity(owner, None)
    }

    /// Create an engine whose buffer holds at most `capacity` pending
    /// envelopes per sender
    pub fn with_capacity(owner: ProcessId, capacity: Option<usize>) -> Self {
        FifoBroadcast {
            owner,
            last_sequence: 0,
            buffer: DeliveryBuffer::with_capacity(capacity),
        }
    }

    /// Stamp the next sequence number on an outgoing broadcast.
    /// The owner's own stream is marked delivered at once, so a copy of this
    /// envelope reflected back to the owner is discarded as stale.
    pub fn broadcast(&mut self, payload: T, timestamp: Ts) -> Envelope<Ts, T> {
        self.last_sequence += 1;
        let sequence = Sequence::new(self.last_sequence);
        self.buffer.advance_past(&self.owner, sequence);

        tracing::trace!(sender = %self.owner, seq = sequence.value(), "broadcast stamped");
        Envelope::new(self.owner.clone(), sequence, payload, timestamp)
    }

    /// Accept an incoming envelope. Returns the envelopes now deliverable in
    /// FIFO order; empty when the envelope was buffered behind a gap.
    pub fn on_receive(&mut self, envelope: Envelope<Ts, T>) -> CausalResult<Vec<Envelope<Ts, T>>> {
        let sender = envelope.sender.clone();
        let sequence = envelope.sequence;

        let ready = self.buffer.accept(envelope).map_err(|err| {
            tracing::debug!(
                receiver = %self.owner,
                sender = %sender,
                seq = sequence.value(),
                error = %err,
                "envelope discarded"
            );
            err
        })?;

        if !ready.is_empty() {
            tracing::debug!(
                receiver = %self.owner,
                sender = %sender,
                delivered = ready.len(),
                next = self.buffer.expected_next(&sender).value(),
                "envelopes released"
            );
        }
        Ok(ready)
    }

    pub fn owner(&self) -> &ProcessId {
        &self.owner
    }

    /// Last sequence this process broadcast (None before the first)
    pub fn last_sequence(&self) -> Option<Sequence> {
        (self.last_sequence > 0).then(|| Sequence::new(self.last_sequence))
    }

    pub fn buffer(&self) -> &DeliveryBuffer<Ts, T> {
        &self.buffer
    }
}

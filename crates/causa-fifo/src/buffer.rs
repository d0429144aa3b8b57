//! Delivery buffer for out-of-order broadcast envelopes

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use causa_core::{CausalError, CausalResult, Envelope, ProcessId, Sequence};

/// Delivery window for a single sender
#[derive(Clone, Debug)]
pub struct SenderWindow<Ts, T> {
    /// Next sequence that may be delivered
    expected_next: Sequence,
    /// Envelopes that arrived ahead of `expected_next`
    pending: BTreeMap<Sequence, Envelope<Ts, T>>,
}

impl<Ts, T> SenderWindow<Ts, T> {
    /// Create a new window expecting sequence 1
    pub fn new() -> Self {
        SenderWindow {
            expected_next: Sequence::FIRST,
            pending: BTreeMap::new(),
        }
    }

    pub fn expected_next(&self) -> Sequence {
        self.expected_next
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Missing sequence ranges below the highest pending one, one range per
    /// hole. Walks the pending keys only, so a large jump costs one range.
    pub fn gaps(&self) -> Vec<RangeInclusive<Sequence>> {
        let mut gaps = Vec::new();
        let mut next = self.expected_next.value();
        for seq in self.pending.keys().map(|seq| seq.value()) {
            if seq > next {
                gaps.push(Sequence::new(next)..=Sequence::new(seq - 1));
            }
            next = seq.saturating_add(1);
        }
        gaps
    }

    /// Accept an envelope. Returns the envelopes that became deliverable,
    /// in sequence order; an empty batch means the envelope was buffered.
    fn accept(
        &mut self,
        envelope: Envelope<Ts, T>,
        capacity: Option<usize>,
    ) -> CausalResult<Vec<Envelope<Ts, T>>> {
        let sequence = envelope.sequence;

        if sequence < self.expected_next {
            return Err(CausalError::StaleMessage {
                sender: envelope.sender,
                sequence,
                expected: self.expected_next,
            });
        }

        if sequence > self.expected_next {
            if self.pending.contains_key(&sequence) {
                return Err(CausalError::DuplicateMessage {
                    sender: envelope.sender,
                    sequence,
                });
            }
            if let Some(limit) = capacity {
                if self.pending.len() >= limit {
                    return Err(CausalError::BufferOverflow {
                        sender: envelope.sender,
                        sequence,
                        capacity: limit,
                    });
                }
            }
            tracing::debug!(
                sender = %envelope.sender,
                seq = sequence.value(),
                expected = self.expected_next.value(),
                "buffering out-of-order envelope"
            );
            self.pending.insert(sequence, envelope);
            return Ok(Vec::new());
        }

        let mut ready = vec![envelope];
        self.expected_next = self.expected_next.next();

        // Drain: bounded by the size of the pending set
        while let Some(next) = self.pending.remove(&self.expected_next) {
            tracing::trace!(
                sender = %next.sender,
                seq = next.sequence.value(),
                "draining buffered envelope"
            );
            ready.push(next);
            self.expected_next = self.expected_next.next();
        }

        Ok(ready)
    }

    /// Mark everything up to `sequence` as delivered
    fn advance_past(&mut self, sequence: Sequence) {
        if sequence >= self.expected_next {
            self.expected_next = sequence.next();
            self.pending.retain(|seq, _| *seq > sequence);
        }
    }
}

impl<Ts, T> Default for SenderWindow<Ts, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-receiver delivery buffer: one window per sender, created lazily
#[derive(Clone, Debug)]
pub struct DeliveryBuffer<Ts, T> {
    windows: HashMap<ProcessId, SenderWindow<Ts, T>>,
    /// Optional bound on pending envelopes per sender (None = unbounded)
    capacity: Option<usize>,
}

impl<Ts, T> DeliveryBuffer<Ts, T> {
    /// Unbounded buffer
    pub fn new() -> Self {
        DeliveryBuffer {
            windows: HashMap::new(),
            capacity: None,
        }
    }

    /// Buffer refusing out-of-order envelopes once a sender has `capacity` pending
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        DeliveryBuffer {
            windows: HashMap::new(),
            capacity,
        }
    }

    /// Accept an envelope from any sender.
    ///
    /// - below expected: `StaleMessage`, state unchanged
    /// - at expected: returns it plus every buffered successor, in order
    /// - above expected: buffered (empty batch), or `DuplicateMessage` if
    ///   that sequence is already pending
    pub fn accept(&mut self, envelope: Envelope<Ts, T>) -> CausalResult<Vec<Envelope<Ts, T>>> {
        let capacity = self.capacity;
        self.windows
            .entry(envelope.sender.clone())
            .or_default()
            .accept(envelope, capacity)
    }

    /// Record that `sender` delivered up to `sequence` without going through
    /// the buffer (a broadcaster delivering its own message).
    pub fn advance_past(&mut self, sender: &ProcessId, sequence: Sequence) {
        self.windows
            .entry(sender.clone())
            .or_default()
            .advance_past(sequence);
    }

    /// Next sequence expected from `sender` (1 for unseen senders)
    pub fn expected_next(&self, sender: &ProcessId) -> Sequence {
        self.windows
            .get(sender)
            .map_or(Sequence::FIRST, |w| w.expected_next())
    }

    pub fn pending_len(&self, sender: &ProcessId) -> usize {
        self.windows.get(sender).map_or(0, |w| w.pending_len())
    }

    /// Pending envelopes across all senders
    pub fn pending_total(&self) -> usize {
        self.windows.values().map(|w| w.pending_len()).sum()
    }

    pub fn gaps(&self, sender: &ProcessId) -> Vec<RangeInclusive<Sequence>> {
        self.windows.get(sender).map_or_else(Vec::new, |w| w.gaps())
    }

    /// Get window for inspection
    pub fn window(&self, sender: &ProcessId) -> Option<&SenderWindow<Ts, T>> {
        self.windows.get(sender)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<Ts, T> Default for DeliveryBuffer<Ts, T> {
    fn default() -> Self {
        Self::new()
    }
}

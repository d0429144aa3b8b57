//! Message bus - the simulated channel between processes
//!
//! A bus accepts a packet and a set of receivers and hands back one transit
//! per receiver, in whatever order it chooses. No ordering holds between
//! different posts; the FIFO engine at the receiver restores per-sender order.

use std::collections::VecDeque;

use causa_core::{Packet, ProcessId};

/// One packet on its way to one receiver
#[derive(Clone, Debug, PartialEq)]
pub struct Transit<Ts, T> {
    pub to: ProcessId,
    pub packet: Packet<Ts, T>,
}

impl<Ts, T> Transit<Ts, T> {
    pub fn new(to: ProcessId, packet: Packet<Ts, T>) -> Self {
        Transit { to, packet }
    }
}

/// Delivery channel used by the deterministic driver
pub trait MessageBus<Ts, T> {
    /// Queue one transit per target
    fn post(&mut self, packet: Packet<Ts, T>, targets: &[ProcessId]);

    /// Next transit to hand to its receiver
    fn next(&mut self) -> Option<Transit<Ts, T>>;

    /// Transits posted but not yet handed out
    fn in_flight(&self) -> usize;

    fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }
}

/// Arrival-order queue. Drivers that want an adversarial schedule pick
/// transits out of order with [`InMemoryBus::take_where`] or flip the queue
/// with [`InMemoryBus::reverse`].
#[derive(Clone, Debug)]
pub struct InMemoryBus<Ts, T> {
    queue: VecDeque<Transit<Ts, T>>,
    posted: u64,
}

impl<Ts, T> InMemoryBus<Ts, T> {
    pub fn new() -> Self {
        InMemoryBus {
            queue: VecDeque::new(),
            posted: 0,
        }
    }

    /// Remove the first in-flight transit matching `predicate`
    pub fn take_where(
        &mut self,
        mut predicate: impl FnMut(&Transit<Ts, T>) -> bool,
    ) -> Option<Transit<Ts, T>> {
        let pos = self.queue.iter().position(|t| predicate(t))?;
        self.queue.remove(pos)
    }

    /// Reverse the order of everything in flight
    pub fn reverse(&mut self) {
        self.queue.make_contiguous().reverse();
    }

    /// Inspect in-flight transits in hand-out order
    pub fn iter(&self) -> impl Iterator<Item = &Transit<Ts, T>> + '_ {
        self.queue.iter()
    }

    /// Total transits ever posted
    pub fn posted(&self) -> u64 {
        self.posted
    }
}

impl<Ts, T> Default for InMemoryBus<Ts, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ts: Clone, T: Clone> MessageBus<Ts, T> for InMemoryBus<Ts, T> {
    fn post(&mut self, packet: Packet<Ts, T>, targets: &[ProcessId]) {
        for to in targets {
            self.queue.push_back(Transit::new(to.clone(), packet.clone()));
            self.posted += 1;
        }
    }

    fn next(&mut self) -> Option<Transit<Ts, T>> {
        self.queue.pop_front()
    }

    fn in_flight(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causa_core::{Envelope, ScalarTimestamp, Sequence};

    fn packet(seq: u64) -> Packet<ScalarTimestamp, &'static str> {
        Envelope::new(ProcessId::new("P1"), Sequence::new(seq), "m", ScalarTimestamp::new(seq)).into()
    }

    #[test]
    fn test_fan_out_one_transit_per_target() {
        let mut bus = InMemoryBus::new();
        bus.post(packet(1), &[ProcessId::new("P2"), ProcessId::new("P3")]);

        assert_eq!(bus.in_flight(), 2);
        assert_eq!(bus.next().unwrap().to, ProcessId::new("P2"));
        assert_eq!(bus.next().unwrap().to, ProcessId::new("P3"));
        assert!(bus.is_idle());
        assert_eq!(bus.posted(), 2);
    }

    #[test]
    fn test_take_where_and_reverse() {
        let mut bus = InMemoryBus::new();
        let p2 = ProcessId::new("P2");
        for seq in 1..=3 {
            bus.post(packet(seq), std::slice::from_ref(&p2));
        }

        let second = bus
            .take_where(|t| t.packet.sequence() == Some(Sequence::new(2)))
            .unwrap();
        assert_eq!(second.packet.sequence(), Some(Sequence::new(2)));

        bus.reverse();
        assert_eq!(bus.next().unwrap().packet.sequence(), Some(Sequence::new(3)));
        assert_eq!(bus.next().unwrap().packet.sequence(), Some(Sequence::new(1)));
        assert!(bus.next().is_none());
    }
}

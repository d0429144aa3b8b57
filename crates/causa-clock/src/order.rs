//! Clock-kind polymorphism
//!
//! `LogicalClock` is what a process owns; `CausalOrder` is what its
//! snapshots can answer. The runtime is written once against these traits
//! and instantiated with either [`ScalarClock`] or [`VectorClock`].

use std::cmp::Ordering;
use std::fmt;

use causa_core::{
    CausalError, CausalResult, Causality, Event, ProcessId, ScalarTimestamp, VectorTimestamp,
};

use crate::{ProcessRegistry, ScalarClock, VectorClock};

/// Comparison contract for timestamp snapshots
pub trait CausalOrder: Clone + fmt::Debug + Send + Sync + 'static {
    /// Can this kind tell happened-before apart from concurrency?
    const DETECTS_CONCURRENCY: bool;

    /// Causal relation between two snapshots.
    /// Kinds that cannot detect concurrency return `UnsupportedQuery`.
    fn causal_cmp(&self, other: &Self) -> CausalResult<Causality>;

    /// Rank consistent with happened-before: if a happened before b then
    /// `a.rank() < b.rank()`. Used to sort histories into a total order.
    fn rank(&self) -> u64;

    fn concurrent_with(&self, other: &Self) -> CausalResult<bool> {
        Ok(self.causal_cmp(other)? == Causality::Concurrent)
    }

    fn happened_before(&self, other: &Self) -> CausalResult<bool> {
        Ok(self.causal_cmp(other)? == Causality::Before)
    }
}

impl CausalOrder for ScalarTimestamp {
    const DETECTS_CONCURRENCY: bool = false;

    fn causal_cmp(&self, _other: &Self) -> CausalResult<Causality> {
        Err(CausalError::UnsupportedQuery(
            "scalar timestamps cannot distinguish happened-before from concurrency",
        ))
    }

    fn rank(&self) -> u64 {
        self.value()
    }
}

impl CausalOrder for VectorTimestamp {
    const DETECTS_CONCURRENCY: bool = true;

    fn causal_cmp(&self, other: &Self) -> CausalResult<Causality> {
        Ok(self.compare(other))
    }

    fn rank(&self) -> u64 {
        self.sum()
    }
}

/// A clock exclusively owned by one process
pub trait LogicalClock: Clone + fmt::Debug + Send + 'static {
    type Timestamp: CausalOrder;

    /// Fresh clock for `owner`, sized by the registry where that matters
    fn for_process(owner: ProcessId, registry: &ProcessRegistry) -> Self;

    fn owner(&self) -> &ProcessId;

    /// Advance for a local, send or broadcast event
    fn tick(&mut self) -> Self::Timestamp;

    /// Validate a received snapshot without touching the clock
    fn admits(&self, received: &Self::Timestamp) -> CausalResult<()>;

    /// Fold in a received snapshot and advance
    fn merge_on_receive(&mut self, received: &Self::Timestamp) -> CausalResult<Self::Timestamp>;

    /// Current snapshot without advancing
    fn now(&self) -> Self::Timestamp;

    /// A process was added to the registry after this clock was created
    fn observe_process(&mut self, id: &ProcessId);
}

impl LogicalClock for ScalarClock {
    type Timestamp = ScalarTimestamp;

    fn for_process(owner: ProcessId, _registry: &ProcessRegistry) -> Self {
        ScalarClock::new(owner)
    }

    fn owner(&self) -> &ProcessId {
        ScalarClock::owner(self)
    }

    fn tick(&mut self) -> ScalarTimestamp {
        ScalarClock::tick(self)
    }

    fn admits(&self, _received: &ScalarTimestamp) -> CausalResult<()> {
        Ok(())
    }

    fn merge_on_receive(&mut self, received: &ScalarTimestamp) -> CausalResult<ScalarTimestamp> {
        Ok(ScalarClock::merge_on_receive(self, *received))
    }

    fn now(&self) -> ScalarTimestamp {
        ScalarClock::now(self)
    }

    fn observe_process(&mut self, _id: &ProcessId) {}
}

impl LogicalClock for VectorClock {
    type Timestamp = VectorTimestamp;

    fn for_process(owner: ProcessId, registry: &ProcessRegistry) -> Self {
        VectorClock::new(owner, registry)
    }

    fn owner(&self) -> &ProcessId {
        VectorClock::owner(self)
    }

    fn tick(&mut self) -> VectorTimestamp {
        self.increment()
    }

    fn admits(&self, received: &VectorTimestamp) -> CausalResult<()> {
        VectorClock::admits(self, received)
    }

    fn merge_on_receive(&mut self, received: &VectorTimestamp) -> CausalResult<VectorTimestamp> {
        VectorClock::merge_on_receive(self, received)
    }

    fn now(&self) -> VectorTimestamp {
        self.snapshot()
    }

    fn observe_process(&mut self, id: &ProcessId) {
        VectorClock::observe_process(self, id)
    }
}

/// Total order over events of any clock kind: rank first, then process id
/// as the deterministic tie-break. Consistent with happened-before.
pub fn total_order<Ts: CausalOrder, T>(a: &Event<Ts, T>, b: &Event<Ts, T>) -> Ordering {
    a.timestamp
        .rank()
        .cmp(&b.timestamp.rank())
        .then_with(|| a.process.cmp(&b.process))
}

/// Sort events into [`total_order`]. Stable, so events of one process that
/// share a rank keep their history order.
pub fn sort_events<Ts: CausalOrder, T>(events: &mut [Event<Ts, T>]) {
    events.sort_by(total_order);
}

/// Did `a` happen before `b`? Only answerable for kinds that detect
/// concurrency.
pub fn happened_before<Ts: CausalOrder, T>(a: &Event<Ts, T>, b: &Event<Ts, T>) -> CausalResult<bool> {
    a.timestamp.happened_before(&b.timestamp)
}

/// Are `a` and `b` causally unrelated?
pub fn concurrent<Ts: CausalOrder, T>(a: &Event<Ts, T>, b: &Event<Ts, T>) -> CausalResult<bool> {
    a.timestamp.concurrent_with(&b.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use causa_core::EventKind;

    fn run_exchange<C: LogicalClock>() -> (C::Timestamp, C::Timestamp) {
        let mut registry = ProcessRegistry::new();
        registry.register(ProcessId::new("P1")).unwrap();
        registry.register(ProcessId::new("P2")).unwrap();

        let mut p1 = C::for_process(ProcessId::new("P1"), &registry);
        let mut p2 = C::for_process(ProcessId::new("P2"), &registry);

        let sent = p1.tick();
        let received = p2.merge_on_receive(&sent).unwrap();
        (sent, received)
    }

    #[test]
    fn test_generic_exchange_ranks_send_before_receive() {
        let (sent, received) = run_exchange::<ScalarClock>();
        assert!(sent.rank() < received.rank());

        let (sent, received) = run_exchange::<VectorClock>();
        assert!(sent.rank() < received.rank());
        assert!(sent.happened_before(&received).unwrap());
    }

    #[test]
    fn test_scalar_rejects_concurrency_query() {
        assert!(!ScalarTimestamp::DETECTS_CONCURRENCY);
        let a = ScalarTimestamp::new(1);
        assert!(matches!(
            a.concurrent_with(&a),
            Err(CausalError::UnsupportedQuery(_))
        ));
    }

    #[test]
    fn test_sort_events_tie_breaks_on_process() {
        let mut events = vec![
            Event::new(ProcessId::new("P2"), EventKind::Local, ScalarTimestamp::new(1), ()),
            Event::new(ProcessId::new("P1"), EventKind::Local, ScalarTimestamp::new(2), ()),
            Event::new(ProcessId::new("P1"), EventKind::Local, ScalarTimestamp::new(1), ()),
        ];
        sort_events(&mut events);

        let order: Vec<(String, u64)> = events
            .iter()
            .map(|e| (e.process.to_string(), e.timestamp.value()))
            .collect();
        assert_eq!(
            order,
            [("P1".to_string(), 1), ("P2".to_string(), 1), ("P1".to_string(), 2)]
        );
    }
}

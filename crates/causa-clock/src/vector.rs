//! Vector clock

use std::collections::BTreeMap;

use causa_core::{CausalError, CausalResult, ProcessId, VectorTimestamp};

use crate::ProcessRegistry;

/// Vector clock - live, mutable counters for every known process
///
/// The key set always equals the registry: processes created after the clock
/// are added as zero entries through [`VectorClock::observe_process`].
/// Snapshots returned to callers are copies and never change afterwards.
#[derive(Clone, Debug)]
pub struct VectorClock {
    owner: ProcessId,
    clocks: BTreeMap<ProcessId, u64>,
}

impl VectorClock {
    /// Create an all-zero clock sized by the registry
    pub fn new(owner: ProcessId, registry: &ProcessRegistry) -> Self {
        let mut clocks: BTreeMap<ProcessId, u64> =
            registry.ids().map(|id| (id.clone(), 0)).collect();
        clocks.entry(owner.clone()).or_insert(0);
        VectorClock { owner, clocks }
    }

    /// Advance own component for a local or send event
    pub fn increment(&mut self) -> VectorTimestamp {
        *self.clocks.entry(self.owner.clone()).or_insert(0) += 1;
        self.snapshot()
    }

    /// Check a received snapshot only references known processes
    pub fn admits(&self, received: &VectorTimestamp) -> CausalResult<()> {
        match received.process_ids().find(|id| !self.clocks.contains_key(*id)) {
            Some(unknown) => Err(CausalError::UnknownProcess(unknown.clone())),
            None => Ok(()),
        }
    }

    /// Element-wise max with the received snapshot, then advance own component.
    /// Leaves the clock untouched when the snapshot is rejected.
    pub fn merge_on_receive(&mut self, received: &VectorTimestamp) -> CausalResult<VectorTimestamp> {
        self.admits(received)?;

        for (id, clock) in received.iter() {
            if let Some(local) = self.clocks.get_mut(id) {
                *local = (*local).max(clock);
            }
        }

        Ok(self.increment())
    }

    /// Extend the vector with a newly registered process
    pub fn observe_process(&mut self, id: &ProcessId) {
        self.clocks.entry(id.clone()).or_insert(0);
    }

    /// Get the counter for a process
    pub fn get(&self, id: &ProcessId) -> u64 {
        self.clocks.get(id).copied().unwrap_or(0)
    }

    /// Immutable copy of the current vector
    pub fn snapshot(&self) -> VectorTimestamp {
        VectorTimestamp::from_entries(self.clocks.iter().map(|(id, &c)| (id.clone(), c)))
    }

    pub fn owner(&self) -> &ProcessId {
        &self.owner
    }
}

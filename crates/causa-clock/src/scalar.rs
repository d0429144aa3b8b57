//! Lamport scalar clock

use causa_core::{ProcessId, ScalarTimestamp};

/// Lamport clock - one counter per process
/// INVARIANT: the counter strictly increases on every local event
#[derive(Clone, Debug)]
pub struct ScalarClock {
    owner: ProcessId,
    value: u64,
}

impl ScalarClock {
    /// Create a new clock starting at zero
    pub fn new(owner: ProcessId) -> Self {
        ScalarClock { owner, value: 0 }
    }

    /// Advance for a local event (send, broadcast, internal step)
    pub fn tick(&mut self) -> ScalarTimestamp {
        self.value += 1;
        ScalarTimestamp(self.value)
    }

    /// Fold in a received timestamp: max(local, received) + 1
    pub fn merge_on_receive(&mut self, received: ScalarTimestamp) -> ScalarTimestamp {
        self.value = self.value.max(received.value()) + 1;
        ScalarTimestamp(self.value)
    }

    /// Current value without advancing
    pub fn now(&self) -> ScalarTimestamp {
        ScalarTimestamp(self.value)
    }

    pub fn owner(&self) -> &ProcessId {
        &self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_increments() {
        let mut clock = ScalarClock::new(ProcessId::new("P1"));
        assert_eq!(clock.now(), ScalarTimestamp::ZERO);
        assert_eq!(clock.tick(), ScalarTimestamp::new(1));
        assert_eq!(clock.tick(), ScalarTimestamp::new(2));
    }

    #[test]
    fn test_merge_takes_max_plus_one() {
        let mut clock = ScalarClock::new(ProcessId::new("P2"));
        assert_eq!(clock.merge_on_receive(ScalarTimestamp::new(5)), ScalarTimestamp::new(6));

        // Local value ahead of the received one
        assert_eq!(clock.merge_on_receive(ScalarTimestamp::new(2)), ScalarTimestamp::new(7));
    }
}

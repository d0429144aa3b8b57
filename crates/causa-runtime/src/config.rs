//! Runtime configuration

/// Simulation configuration shared by `System` and `Cluster`
#[derive(Clone, Debug)]
pub struct SystemConfig {
    /// Maximum out-of-order envelopes buffered per (receiver, sender).
    /// `None` keeps the buffer unbounded: a sender that skips a sequence
    /// number leaves every later envelope pending forever.
    pub max_pending_per_sender: Option<usize>,
    /// Transits `System::run_until_idle` pumps before giving up
    pub max_steps: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            max_pending_per_sender: None,
            max_steps: 1_000_000,
        }
    }
}

impl SystemConfig {
    /// Bounded delivery buffers: out-of-order envelopes beyond `capacity`
    /// per sender are refused with `BufferOverflow`
    pub fn bounded(capacity: usize) -> Self {
        SystemConfig {
            max_pending_per_sender: Some(capacity),
            ..Self::default()
        }
    }
}

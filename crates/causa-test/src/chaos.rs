//! Chaos message bus
//!
//! Adversarial but lossless delivery:
//! - Reordering within a bounded window
//! - Duplication
//!
//! Packets are never dropped, since nothing above the bus retransmits.

use std::collections::VecDeque;

use causa_core::{Packet, ProcessId};
use causa_runtime::{MessageBus, Transit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chaos configuration
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    /// Seed for the schedule; equal seeds give equal schedules
    pub seed: u64,
    /// Probability that a hand-out skips ahead of the queue head (0.0 - 1.0)
    pub reorder_prob: f64,
    /// How far past the head a reordered hand-out may reach
    pub reorder_depth: usize,
    /// Probability that a posted transit is queued twice (0.0 - 1.0)
    pub duplicate_prob: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            seed: 0,
            reorder_prob: 0.2,
            reorder_depth: 4,
            duplicate_prob: 0.05,
        }
    }
}

impl ChaosConfig {
    /// No reordering, no duplication: behaves like an arrival-order queue
    pub fn calm() -> Self {
        ChaosConfig {
            seed: 0,
            reorder_prob: 0.0,
            reorder_depth: 0,
            duplicate_prob: 0.0,
        }
    }

    /// Heavy reordering and frequent duplicates
    pub fn hostile() -> Self {
        ChaosConfig {
            seed: 0,
            reorder_prob: 0.6,
            reorder_depth: 16,
            duplicate_prob: 0.25,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Chaos bus statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChaosStats {
    pub transits_posted: u64,
    pub transits_handed_out: u64,
    pub transits_reordered: u64,
    pub transits_duplicated: u64,
}

impl ChaosStats {
    pub fn reorder_rate(&self) -> f64 {
        if self.transits_handed_out == 0 {
            0.0
        } else {
            self.transits_reordered as f64 / self.transits_handed_out as f64
        }
    }
}

/// Seeded message bus that reorders and duplicates transits
pub struct ChaosBus<Ts, T> {
    config: ChaosConfig,
    rng: StdRng,
    in_flight: VecDeque<Transit<Ts, T>>,
    stats: ChaosStats,
}

impl<Ts, T> ChaosBus<Ts, T> {
    pub fn new(config: ChaosConfig) -> Self {
        ChaosBus {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            in_flight: VecDeque::new(),
            stats: ChaosStats::default(),
        }
    }

    pub fn calm() -> Self {
        Self::new(ChaosConfig::calm())
    }

    pub fn hostile(seed: u64) -> Self {
        Self::new(ChaosConfig::hostile().with_seed(seed))
    }

    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Get current statistics
    pub fn stats(&self) -> &ChaosStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = ChaosStats::default();
    }
}

impl<Ts: Clone, T: Clone> MessageBus<Ts, T> for ChaosBus<Ts, T> {
    fn post(&mut self, packet: Packet<Ts, T>, targets: &[ProcessId]) {
        for to in targets {
            let transit = Transit::new(to.clone(), packet.clone());
            self.stats.transits_posted += 1;

            if self.rng.gen_bool(self.config.duplicate_prob) {
                self.in_flight.push_back(transit.clone());
                self.stats.transits_duplicated += 1;
            }
            self.in_flight.push_back(transit);
        }
    }

    fn next(&mut self) -> Option<Transit<Ts, T>> {
        if self.in_flight.is_empty() {
            return None;
        }

        let reach = self.config.reorder_depth.min(self.in_flight.len() - 1);
        let index = if reach > 0 && self.rng.gen_bool(self.config.reorder_prob) {
            self.rng.gen_range(1..=reach)
        } else {
            0
        };

        let transit = self.in_flight.remove(index)?;
        self.stats.transits_handed_out += 1;
        if index > 0 {
            self.stats.transits_reordered += 1;
            tracing::trace!(receiver = %transit.to, skipped = index, "transit reordered");
        }
        Some(transit)
    }

    fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

//! Logical time primitives for CAUSA
//!
//! Two timestamp kinds are modelled:
//! - Scalar (Lamport): a single counter, totally ordered, consistent with
//!   happened-before but blind to concurrency
//! - Vector: one counter per known process, an exact partial order
//!
//! Timestamps handed out by clocks are immutable snapshots. The live,
//! mutable state stays inside the owning clock.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::ProcessId;

/// Lamport timestamp - monotonically increasing per owning process
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScalarTimestamp(pub u64);

impl ScalarTimestamp {
    pub const ZERO: ScalarTimestamp = ScalarTimestamp(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        ScalarTimestamp(value)
    }

    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ScalarTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L({})", self.0)
    }
}

impl fmt::Display for ScalarTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of comparing two vector timestamps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Causality {
    /// All components equal
    Equal,
    /// Left happened before right
    Before,
    /// Right happened before left
    After,
    /// Neither happened before the other
    Concurrent,
}

impl Causality {
    /// View the same relation from the other side
    pub fn reverse(self) -> Self {
        match self {
            Causality::Before => Causality::After,
            Causality::After => Causality::Before,
            other => other,
        }
    }

    /// Is there a happened-before relation in either direction?
    pub fn is_ordered(self) -> bool {
        matches!(self, Causality::Before | Causality::After)
    }
}

/// Vector timestamp - immutable snapshot of a vector clock
///
/// Absent entries are implicitly zero, so snapshots taken before and after
/// the registry grew still compare cleanly. Equality follows the same rule:
/// `{P1: 1}` equals `{P1: 1, P2: 0}`.
#[derive(Clone, Default)]
pub struct VectorTimestamp {
    clocks: BTreeMap<ProcessId, u64>,
}

impl VectorTimestamp {
    pub fn new() -> Self {
        VectorTimestamp {
            clocks: BTreeMap::new(),
        }
    }

    /// All-zero snapshot over the given processes
    pub fn zeroed<'a>(ids: impl IntoIterator<Item = &'a ProcessId>) -> Self {
        VectorTimestamp {
            clocks: ids.into_iter().map(|id| (id.clone(), 0)).collect(),
        }
    }

    /// Build a snapshot from explicit entries
    pub fn from_entries(entries: impl IntoIterator<Item = (ProcessId, u64)>) -> Self {
        VectorTimestamp {
            clocks: entries.into_iter().collect(),
        }
    }

    /// Get the counter for a process (zero if absent)
    #[inline]
    pub fn get(&self, id: &ProcessId) -> u64 {
        self.clocks.get(id).copied().unwrap_or(0)
    }

    /// Does the snapshot carry an explicit entry for this process?
    #[inline]
    pub fn contains(&self, id: &ProcessId) -> bool {
        self.clocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Explicit entries in process order
    pub fn iter(&self) -> impl Iterator<Item = (&ProcessId, u64)> + '_ {
        self.clocks.iter().map(|(id, &c)| (id, c))
    }

    pub fn process_ids(&self) -> impl Iterator<Item = &ProcessId> + '_ {
        self.clocks.keys()
    }

    /// Sum of all components. Strictly grows along every happened-before
    /// chain, so it ranks events in an order consistent with causality.
    pub fn sum(&self) -> u64 {
        self.clocks.values().sum()
    }

    /// Compare over the union of keys
    pub fn compare(&self, other: &VectorTimestamp) -> Causality {
        let mut less = false;
        let mut greater = false;

        for id in self.clocks.keys().chain(other.clocks.keys()) {
            match self.get(id).cmp(&other.get(id)) {
                Ordering::Less => less = true,
                Ordering::Greater => greater = true,
                Ordering::Equal => {}
            }
            if less && greater {
                return Causality::Concurrent;
            }
        }

        match (less, greater) {
            (false, false) => Causality::Equal,
            (true, false) => Causality::Before,
            (false, true) => Causality::After,
            (true, true) => Causality::Concurrent,
        }
    }

    /// Check if self happens-before other
    pub fn happens_before(&self, other: &VectorTimestamp) -> bool {
        self.compare(other) == Causality::Before
    }

    /// Check if two snapshots are concurrent (neither happens-before)
    pub fn concurrent_with(&self, other: &VectorTimestamp) -> bool {
        self.compare(other) == Causality::Concurrent
    }

    /// Componentwise self >= other
    pub fn dominates(&self, other: &VectorTimestamp) -> bool {
        matches!(self.compare(other), Causality::Equal | Causality::After)
    }

    /// Join of two snapshots (element-wise max)
    pub fn join(&self, other: &VectorTimestamp) -> VectorTimestamp {
        let mut merged = self.clocks.clone();

        for (id, &clock) in &other.clocks {
            merged
                .entry(id.clone())
                .and_modify(|c| *c = (*c).max(clock))
                .or_insert(clock);
        }

        VectorTimestamp { clocks: merged }
    }
}

impl PartialEq for VectorTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Causality::Equal
    }
}

impl Eq for VectorTimestamp {}

impl PartialOrd for VectorTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.compare(other) {
            Causality::Equal => Some(Ordering::Equal),
            Causality::Before => Some(Ordering::Less),
            Causality::After => Some(Ordering::Greater),
            Causality::Concurrent => None,
        }
    }
}

impl fmt::Debug for VectorTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.clocks.iter().map(|(id, c)| (id.as_str(), c)))
            .finish()
    }
}

impl fmt::Display for VectorTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

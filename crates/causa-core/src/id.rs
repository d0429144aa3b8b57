//! Identity types for CAUSA
//!
//! Process identifiers are opaque labels picked by whoever drives the
//! simulation ("P1", "P2", ...). Every vector snapshot carries a copy of each
//! known id, so they are reference counted and cheap to clone.

use std::fmt;
use std::sync::Arc;

/// Process identity - opaque, immutable, compared by value
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(Arc<str>);

impl ProcessId {
    #[inline]
    pub fn new(id: impl AsRef<str>) -> Self {
        ProcessId(Arc::from(id.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProcessId {
    fn from(id: &str) -> Self {
        ProcessId::new(id)
    }
}

impl From<String> for ProcessId {
    fn from(id: String) -> Self {
        ProcessId(Arc::from(id))
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broadcast sequence number - assigned by the sender, starts at 1,
/// strictly increasing per sender
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(pub u64);

impl Sequence {
    /// First sequence number of every sender
    pub const FIRST: Sequence = Sequence(1);

    #[inline]
    pub fn new(value: u64) -> Self {
        Sequence(value)
    }

    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Sequence::FIRST
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

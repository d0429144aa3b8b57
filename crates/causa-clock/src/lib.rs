//! CAUSA Clocks - Logical time for simulated processes
//!
//! This crate implements:
//! - ScalarClock: Lamport counter (tick, merge on receive)
//! - VectorClock: per-process counters sized by the registry
//! - CausalOrder / LogicalClock: the seam that keeps the runtime generic
//!   over the clock kind
//! - ProcessRegistry: the set of live process ids

pub mod registry;
pub mod scalar;
pub mod vector;
pub mod order;

pub use registry::*;
pub use scalar::*;
pub use vector::*;
pub use order::*;

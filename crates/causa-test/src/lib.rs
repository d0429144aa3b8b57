//! CAUSA Test Harness - Adversarial delivery and scenario validation
//!
//! This crate provides:
//! - ChaosBus: seeded reordering and duplication of in-flight transits
//! - ScenarioBuilder: scripted process sets driven over a chaos bus
//! - Integration tests and benchmarks for the clock and delivery paths

pub mod chaos;
pub mod scenario;

pub use chaos::*;
pub use scenario::*;

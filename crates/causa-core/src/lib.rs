//! CAUSA Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the causal ordering simulator:
//! - Identifiers (ProcessId, Sequence)
//! - Logical time primitives (ScalarTimestamp, VectorTimestamp, Causality)
//! - Events, broadcast envelopes and direct messages
//! - The error type shared by every layer

pub mod id;
pub mod time;
pub mod event;
pub mod error;

pub use id::*;
pub use time::*;
pub use event::*;
pub use error::*;

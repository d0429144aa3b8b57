//! CAUSA FIFO Broadcast - per-sender ordered delivery
//!
//! This crate implements the FIFO broadcast discipline:
//! - Sequence assignment on broadcast
//! - Per-sender delivery windows (expected next + pending set)
//! - Duplicate and stale detection
//! - Draining of buffered envelopes once a gap closes
//!
//! Senders are independent: a gap in one sender's stream never holds back
//! another sender's envelopes at the same receiver.

pub mod buffer;
pub mod engine;

pub use buffer::*;
pub use engine::*;

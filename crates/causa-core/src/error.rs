//! Error types for CAUSA

use thiserror::Error;

use crate::{ProcessId, Sequence};

/// Core CAUSA errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CausalError {
    // Registry errors
    #[error("Unknown process: {0}")]
    UnknownProcess(ProcessId),

    #[error("Process already exists: {0}")]
    DuplicateProcess(ProcessId),

    // Delivery errors
    #[error("Duplicate message: seq {sequence} from {sender} is already pending")]
    DuplicateMessage { sender: ProcessId, sequence: Sequence },

    #[error("Stale message: seq {sequence} from {sender}, expecting {expected}")]
    StaleMessage {
        sender: ProcessId,
        sequence: Sequence,
        expected: Sequence,
    },

    #[error("Delivery buffer full: seq {sequence} from {sender} refused ({capacity} pending)")]
    BufferOverflow {
        sender: ProcessId,
        sequence: Sequence,
        capacity: usize,
    },

    #[error("Message intended for {intended}, but received by {actual}")]
    MisroutedMessage {
        intended: ProcessId,
        actual: ProcessId,
    },

    // Clock errors
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(&'static str),

    // Runtime errors
    #[error("Cluster closed")]
    ClusterClosed,
}

impl CausalError {
    /// Non-fatal delivery outcomes: the message is discarded and the
    /// receiver's state is left as it was.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CausalError::DuplicateMessage { .. }
                | CausalError::StaleMessage { .. }
                | CausalError::BufferOverflow { .. }
        )
    }
}

/// Result type for CAUSA operations
pub type CausalResult<T> = Result<T, CausalError>;

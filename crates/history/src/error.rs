use std::fmt;

use examdesk_gateway::GatewayError;

use crate::model::Operation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Loading the log failed; the cached entries are unchanged.
    Fetch(GatewayError),
    /// Clearing or deleting on the server failed.
    Mutation(GatewayError),
    /// Positional delete outside the displayed list.
    Position { position: usize, len: usize },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "cannot load history: {e}"),
            Self::Mutation(e) => write!(f, "cannot change history: {e}"),
            Self::Position { position, len } => {
                write!(f, "no history entry at position {position} (have {len})")
            }
        }
    }
}

impl std::error::Error for HistoryError {}

/// Why an entry could not be fully normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningReason {
    /// Payload text did not decode even after sentinel repair.
    UnparseablePayload(String),
    /// Payload decoded to something other than a record.
    NonRecordPayload,
    /// Time text is not a recognized timestamp; entry sorts last.
    UnparseableTime(String),
}

/// Non-fatal reconciliation problem. The entry is kept with placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationWarning {
    /// Position in the reconciled (sorted) output.
    pub position: usize,
    pub operation: Operation,
    pub reason: WarningReason,
}

impl fmt::Display for ReconciliationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "history entry {} ({}): ", self.position, self.operation)?;
        match &self.reason {
            WarningReason::UnparseablePayload(msg) => write!(f, "payload unreadable: {msg}"),
            WarningReason::NonRecordPayload => write!(f, "payload is not a record"),
            WarningReason::UnparseableTime(raw) => write!(f, "unrecognized time '{raw}'"),
        }
    }
}

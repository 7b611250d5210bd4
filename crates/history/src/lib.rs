//! `examdesk-history`: audit log reconciliation.
//!
//! Pure engine plus a small read-through cache:
//! - `sentinel`: text pre-pass that neutralizes non-finite number literals
//! - `reconcile`: raw entries -> normalized, newest-first entries
//! - `summary`: per-operation display text
//! - `view`: cached history with positional delete and last-request-wins refresh

pub mod error;
pub mod model;
pub mod reconcile;
pub mod sentinel;
pub mod summary;
pub mod view;

pub use error::{HistoryError, ReconciliationWarning, WarningReason};
pub use model::{EntryTime, HistoryEntry, NormalizedHistoryEntry, Operation, RawPayload};
pub use reconcile::{reconcile, reconcile_with_warnings, sort_newest_first, Reconciliation};
pub use sentinel::repair_non_finite;
pub use summary::{display_time, operation_label, summarize, NOT_AVAILABLE};
pub use view::{parse_history_body, HistorySource, HistoryView, RefreshOutcome, RefreshTicket};

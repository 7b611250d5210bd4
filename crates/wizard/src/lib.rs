//! `examdesk-wizard`: record mutation flows.
//!
//! - `batch`: the staged create/delete wizard (size, collect, confirm, commit)
//! - `lookup`: read flow, records by identifier with optional year filter
//! - `update`: search-then-edit flow producing a typed change set
//! - `store`: the `RecordStore` seam, implemented by the gateway client

pub mod batch;
pub mod error;
pub mod lookup;
pub mod store;
pub mod update;

pub use batch::{BatchWizard, Phase, WizardKind};
pub use error::{CommitError, WizardError};
pub use lookup::{lookup, Lookup};
pub use store::RecordStore;
pub use update::UpdateSession;

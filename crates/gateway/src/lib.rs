//! Exam records API client.
//!
//! This crate is the single source of truth for the records wire contract:
//! students CRUD, export, clean, history log, province table, chart data.
//!
//! No business logic. No retries. A failed call is surfaced as-is and the
//! caller decides whether to continue.

mod client;
mod error;
mod export;
mod model;

pub use client::{GatewayClient, GatewayOptions, DEFAULT_API_BASE};
pub use error::GatewayError;
pub use export::{CleanSource, ExportFile, ExportResult, CLEANED_DATA_FILE, UPDATED_DATA_FILE};
pub use model::{
    filter_by_year, value_text, ChangeSet, ChartKind, EntityDraft, Province, StudentRecord,
    CREATE_FIELDS, DELETE_FIELDS, FIELD_ID, FIELD_YEAR, RECORD_ID_KEY, RECORD_YEAR_KEY,
    SUBJECT_FIELDS,
};

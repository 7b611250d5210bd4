use examdesk_gateway::{filter_by_year, StudentRecord, FIELD_ID};

use crate::error::WizardError;
use crate::store::RecordStore;

/// Result of a record search. `NotFound` is an answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Vec<StudentRecord>),
    NotFound,
}

impl Lookup {
    pub fn records(&self) -> &[StudentRecord] {
        match self {
            Self::Found(records) => records,
            Self::NotFound => &[],
        }
    }
}

/// Records for `id`, optionally narrowed to one exam year.
///
/// A blank `year` means no filter.
pub fn lookup<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
    year: Option<&str>,
) -> Result<Lookup, WizardError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(WizardError::validation(FIELD_ID, "identifier is required"));
    }

    let mut records = store.fetch(id)?;
    if let Some(year) = year.filter(|y| !y.trim().is_empty()) {
        records = filter_by_year(records, year);
    }

    log::debug!("lookup {id}: {} record(s)", records.len());
    Ok(if records.is_empty() {
        Lookup::NotFound
    } else {
        Lookup::Found(records)
    })
}

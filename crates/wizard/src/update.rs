//! Search-then-edit flow for a single record.
//!
//! The record is located by identifier and year, edited as a copy, and the
//! whole edited copy is sent back with subject scores coerced to numbers.
//! The `PUT` always targets the key that was searched, even if the identifier
//! or year columns were edited.

use serde_json::{Map, Number, Value};

use examdesk_gateway::{ChangeSet, StudentRecord, FIELD_ID, FIELD_YEAR, SUBJECT_FIELDS};

use crate::error::WizardError;
use crate::lookup::{lookup, Lookup};
use crate::store::RecordStore;

#[derive(Debug, Clone, Default)]
pub struct UpdateSession {
    key: Option<(String, String)>,
    original: Option<StudentRecord>,
    edited: Map<String, Value>,
}

impl UpdateSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the record for `id` in `year`. On `Found`, the first match is
    /// loaded for editing; on `NotFound` any previous record is dropped.
    pub fn search<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        id: &str,
        year: &str,
    ) -> Result<Lookup, WizardError> {
        let (id, year) = (id.trim(), year.trim());
        if id.is_empty() {
            return Err(WizardError::validation(FIELD_ID, "identifier is required"));
        }
        if year.is_empty() {
            return Err(WizardError::validation(FIELD_YEAR, "year is required"));
        }

        let found = lookup(store, id, Some(year))?;
        match found.records().first() {
            Some(record) => {
                self.key = Some((id.to_string(), year.to_string()));
                self.edited = record.0.clone();
                self.original = Some(record.clone());
            }
            None => {
                self.key = None;
                self.original = None;
                self.edited.clear();
            }
        }
        Ok(found)
    }

    pub fn original(&self) -> Option<&StudentRecord> {
        self.original.as_ref()
    }

    pub fn edited(&self) -> &Map<String, Value> {
        &self.edited
    }

    /// Edit one column of the loaded record.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), WizardError> {
        if self.original.is_none() {
            return Err(WizardError::NoRecord);
        }
        match self.edited.get_mut(name) {
            Some(slot) => {
                *slot = Value::String(value.into());
                Ok(())
            }
            None => Err(WizardError::validation(name, "no such column in this record")),
        }
    }

    /// The body for the `PUT`: every column of the edited copy.
    ///
    /// Subject scores become numbers (`null` when blank); a score that is
    /// not a number is rejected.
    pub fn changes(&self) -> Result<ChangeSet, WizardError> {
        if self.original.is_none() {
            return Err(WizardError::NoRecord);
        }

        let mut changes = ChangeSet::new();
        for (key, value) in &self.edited {
            let value = if SUBJECT_FIELDS.contains(&key.as_str()) {
                score_value(key, value)?
            } else {
                value.clone()
            };
            changes.insert(key.clone(), value);
        }

        if changes.is_empty() {
            return Err(WizardError::validation("changes", "nothing to update"));
        }
        Ok(changes)
    }

    /// Send the edited record. Returns the change set that was sent.
    pub fn submit<S: RecordStore + ?Sized>(&self, store: &S) -> Result<ChangeSet, WizardError> {
        let (id, year) = self.key.as_ref().ok_or(WizardError::NoRecord)?;
        let changes = self.changes()?;
        store.update(id, year, &changes)?;
        log::info!("updated {id}/{year} ({} column(s))", changes.len());
        Ok(changes)
    }
}

fn score_value(field: &str, value: &Value) -> Result<Value, WizardError> {
    match value {
        Value::Null | Value::Number(_) => Ok(value.clone()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(Value::Null);
            }
            if let Ok(n) = s.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
            s.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| WizardError::validation(field, format!("'{s}' is not a score")))
        }
        other => Err(WizardError::validation(field, format!("{other} is not a score"))),
    }
}

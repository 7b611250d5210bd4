use std::cmp::Reverse;

use serde_json::{Map, Value};

use crate::error::{ReconciliationWarning, WarningReason};
use crate::model::{EntryTime, HistoryEntry, NormalizedHistoryEntry, RawPayload};
use crate::sentinel::repair_non_finite;

/// Output of [`reconcile_with_warnings`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Normalized entries, newest first.
    pub entries: Vec<NormalizedHistoryEntry>,
    /// For each output row, the index of its source entry in the input.
    pub origins: Vec<usize>,
    pub warnings: Vec<ReconciliationWarning>,
}

/// Normalize and order raw audit entries. Warnings are logged, not returned.
///
/// Total and pure: every input entry yields exactly one output entry.
pub fn reconcile(raw: &[HistoryEntry]) -> Vec<NormalizedHistoryEntry> {
    let out = reconcile_with_warnings(raw);
    for warning in &out.warnings {
        log::warn!("{warning}");
    }
    out.entries
}

/// Like [`reconcile`], but also reports where each row came from and which
/// rows were only partially readable.
pub fn reconcile_with_warnings(raw: &[HistoryEntry]) -> Reconciliation {
    let mut rows: Vec<(NormalizedHistoryEntry, usize, Vec<WarningReason>)> = raw
        .iter()
        .enumerate()
        .map(|(origin, entry)| {
            let (normalized, reasons) = normalize(entry);
            (normalized, origin, reasons)
        })
        .collect();

    order_by_time(&mut rows, |row| &row.0.time);

    let mut out = Reconciliation {
        entries: Vec::with_capacity(rows.len()),
        origins: Vec::with_capacity(rows.len()),
        warnings: Vec::new(),
    };
    for (position, (entry, origin, reasons)) in rows.into_iter().enumerate() {
        for reason in reasons {
            out.warnings.push(ReconciliationWarning {
                position,
                operation: entry.operation.clone(),
                reason,
            });
        }
        out.entries.push(entry);
        out.origins.push(origin);
    }
    out
}

/// Newest first; entries with equal or unreadable times keep their relative order,
/// and unreadable times go after every readable one.
pub fn sort_newest_first(entries: &mut [NormalizedHistoryEntry]) {
    order_by_time(entries, |entry| &entry.time);
}

pub(crate) fn order_by_time<T>(rows: &mut [T], time: impl Fn(&T) -> &EntryTime) {
    // sort_by_cached_key is stable
    rows.sort_by_cached_key(|row| {
        let instant = time(row).instant();
        (instant.is_none(), Reverse(instant))
    });
}

fn normalize(entry: &HistoryEntry) -> (NormalizedHistoryEntry, Vec<WarningReason>) {
    let mut reasons = Vec::new();

    let payload = match &entry.payload {
        RawPayload::Structured(map) => Some(map.clone()),
        RawPayload::Absent => None,
        RawPayload::Text(text) => match decode_payload_text(text) {
            Ok(map) => map,
            Err(reason) => {
                reasons.push(reason);
                None
            }
        },
        RawPayload::Unsupported(_) => {
            reasons.push(WarningReason::NonRecordPayload);
            None
        }
    };

    if entry.time.instant().is_none() {
        reasons.push(WarningReason::UnparseableTime(entry.time.raw().to_string()));
    }

    let normalized = NormalizedHistoryEntry {
        time: entry.time.clone(),
        operation: entry.operation.clone(),
        payload,
        queried_identifier: entry.queried_identifier.clone(),
    };
    (normalized, reasons)
}

fn decode_payload_text(text: &str) -> Result<Option<Map<String, Value>>, WarningReason> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let repaired = repair_non_finite(text);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(Value::Null) => Ok(None),
        Ok(_) => Err(WarningReason::NonRecordPayload),
        Err(e) => Err(WarningReason::UnparseablePayload(e.to_string())),
    }
}

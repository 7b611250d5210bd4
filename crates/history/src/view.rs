//! Read-through cache of the server's audit log.
//!
//! The server is authoritative. The view only holds the last reconciled
//! fetch, and every local mutation invalidates it and reloads. Positions
//! handed to [`HistoryView::remove_at`] index the displayed (sorted) rows;
//! the view translates them to the server's stored order before deleting.

use std::borrow::Cow;

use serde_json::Value;

use examdesk_gateway::{GatewayClient, GatewayError};

use crate::error::{HistoryError, ReconciliationWarning};
use crate::model::{HistoryEntry, NormalizedHistoryEntry};
use crate::reconcile::{order_by_time, reconcile_with_warnings};
use crate::sentinel::repair_non_finite;

/// Where history comes from. Implemented by the gateway client and by test fakes.
pub trait HistorySource {
    fn fetch_history(&self) -> Result<Vec<HistoryEntry>, GatewayError>;
    fn clear_history(&self) -> Result<(), GatewayError>;
    /// Delete by index into the server's stored order.
    fn delete_history_item(&self, index: usize) -> Result<(), GatewayError>;
}

impl HistorySource for GatewayClient {
    fn fetch_history(&self) -> Result<Vec<HistoryEntry>, GatewayError> {
        parse_history_body(&self.fetch_history_text()?)
    }

    fn clear_history(&self) -> Result<(), GatewayError> {
        GatewayClient::clear_history(self).map(|_| ())
    }

    fn delete_history_item(&self, index: usize) -> Result<(), GatewayError> {
        GatewayClient::delete_history_item(self, index).map(|_| ())
    }
}

/// Decode a `GET /history` body into raw entries.
///
/// Tries strict JSON first, then once more after non-finite repair. The
/// body may be a bare array or an object with a `data` array.
pub fn parse_history_body(body: &str) -> Result<Vec<HistoryEntry>, GatewayError> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(strict) => match repair_non_finite(body) {
            Cow::Borrowed(_) => return Err(GatewayError::Decode(strict.to_string())),
            Cow::Owned(repaired) => {
                log::warn!("history body contained non-finite literals; repaired before decoding");
                serde_json::from_str(&repaired).map_err(|e| GatewayError::Decode(e.to_string()))?
            }
        },
    };

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| GatewayError::Decode("expected an array of history entries".into()))?,
        _ => return Err(GatewayError::Decode("expected an array of history entries".into())),
    };

    Ok(items.iter().map(HistoryEntry::from_value).collect())
}

/// Token for one refresh request. Only the newest ticket may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh was started after this one; the result was dropped.
    Superseded,
}

#[derive(Debug, Default)]
pub struct HistoryView {
    entries: Vec<NormalizedHistoryEntry>,
    /// Server-order index for each displayed row.
    origins: Vec<usize>,
    warnings: Vec<ReconciliationWarning>,
    issued: u64,
    loaded: bool,
    stale: bool,
}

impl HistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[NormalizedHistoryEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> &[ReconciliationWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True after a successful load with no local mutation since.
    pub fn is_fresh(&self) -> bool {
        self.loaded && !self.stale
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Start a refresh. Any ticket issued earlier becomes stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        RefreshTicket(self.issued)
    }

    /// Apply a fetch result, unless a newer refresh has been started since.
    pub fn apply_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<HistoryEntry>, GatewayError>,
    ) -> Result<RefreshOutcome, HistoryError> {
        if ticket.0 != self.issued {
            log::debug!("dropping history refresh #{} (latest is #{})", ticket.0, self.issued);
            return Ok(RefreshOutcome::Superseded);
        }

        let raw = result.map_err(HistoryError::Fetch)?;
        let reconciled = reconcile_with_warnings(&raw);
        for warning in &reconciled.warnings {
            log::warn!("{warning}");
        }

        self.entries = reconciled.entries;
        self.origins = reconciled.origins;
        self.warnings = reconciled.warnings;
        self.loaded = true;
        self.stale = false;
        log::info!("history loaded: {} entries", self.entries.len());
        Ok(RefreshOutcome::Applied)
    }

    /// Fetch and apply in one step.
    pub fn refresh<S: HistorySource + ?Sized>(&mut self, source: &S) -> Result<(), HistoryError> {
        let ticket = self.begin_refresh();
        let result = source.fetch_history();
        self.apply_refresh(ticket, result).map(|_| ())
    }

    /// Delete the row displayed at `position`, then reload.
    ///
    /// If the delete succeeds but the reload fails, the row is dropped
    /// locally (and the rest re-sorted) and the reload error is returned;
    /// the view stays marked stale.
    pub fn remove_at<S: HistorySource + ?Sized>(
        &mut self,
        source: &S,
        position: usize,
    ) -> Result<(), HistoryError> {
        let len = self.entries.len();
        if position >= len {
            return Err(HistoryError::Position { position, len });
        }

        let server_index = self.origins[position];
        source
            .delete_history_item(server_index)
            .map_err(HistoryError::Mutation)?;
        log::info!("deleted history row {position} (server index {server_index})");

        self.entries.remove(position);
        self.origins.remove(position);
        for origin in self.origins.iter_mut() {
            if *origin > server_index {
                *origin -= 1;
            }
        }
        self.resort();
        self.warnings.clear();
        self.invalidate();

        self.refresh(source)
    }

    /// Clear the server log and the cache.
    pub fn clear<S: HistorySource + ?Sized>(&mut self, source: &S) -> Result<(), HistoryError> {
        source.clear_history().map_err(HistoryError::Mutation)?;
        // supersede any refresh still in flight
        self.issued += 1;
        self.entries.clear();
        self.origins.clear();
        self.warnings.clear();
        self.loaded = true;
        self.stale = false;
        log::info!("history cleared");
        Ok(())
    }

    fn resort(&mut self) {
        let mut rows: Vec<(NormalizedHistoryEntry, usize)> = self
            .entries
            .drain(..)
            .zip(self.origins.drain(..))
            .collect();
        order_by_time(&mut rows, |row| &row.0.time);
        let (entries, origins) = rows.into_iter().unzip();
        self.entries = entries;
        self.origins = origins;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    /// In-memory log in server order.
    struct FakeLog {
        items: RefCell<Vec<Value>>,
        fail_fetch: RefCell<bool>,
        deleted: RefCell<Vec<usize>>,
    }

    impl FakeLog {
        fn new(items: Vec<Value>) -> Self {
            Self {
                items: RefCell::new(items),
                fail_fetch: RefCell::new(false),
                deleted: RefCell::new(Vec::new()),
            }
        }
    }

    impl HistorySource for FakeLog {
        fn fetch_history(&self) -> Result<Vec<HistoryEntry>, GatewayError> {
            if *self.fail_fetch.borrow() {
                return Err(GatewayError::Network("offline".into()));
            }
            Ok(self.items.borrow().iter().map(HistoryEntry::from_value).collect())
        }

        fn clear_history(&self) -> Result<(), GatewayError> {
            self.items.borrow_mut().clear();
            Ok(())
        }

        fn delete_history_item(&self, index: usize) -> Result<(), GatewayError> {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return Err(GatewayError::Api { status: 404, message: "no such item".into() });
            }
            items.remove(index);
            self.deleted.borrow_mut().push(index);
            Ok(())
        }
    }

    fn entry(time: &str, sbd: &str) -> Value {
        json!({"time": time, "operation": "CREATE", "data": {"SBD": sbd, "Year": 2020}})
    }

    fn ids(view: &HistoryView) -> Vec<String> {
        view.entries()
            .iter()
            .map(|e| e.payload.as_ref().unwrap()["SBD"].as_str().unwrap().to_string())
            .collect()
    }

    fn oldest_first_log() -> FakeLog {
        FakeLog::new(vec![
            entry("2023-01-01T00:00:00", "a"),
            entry("2023-01-02T00:00:00", "b"),
            entry("2023-01-03T00:00:00", "c"),
        ])
    }

    #[test]
    fn test_refresh_sorts_newest_first() {
        let log = oldest_first_log();
        let mut view = HistoryView::new();
        assert!(!view.is_fresh());
        view.refresh(&log).unwrap();
        assert!(view.is_fresh());
        assert_eq!(ids(&view), ["c", "b", "a"]);
    }

    #[test]
    fn test_remove_at_translates_to_server_index() {
        let log = oldest_first_log();
        let mut view = HistoryView::new();
        view.refresh(&log).unwrap();

        // displayed row 0 is "c", stored last on the server
        view.remove_at(&log, 0).unwrap();
        assert_eq!(*log.deleted.borrow(), [2]);
        assert_eq!(ids(&view), ["b", "a"]);

        view.remove_at(&log, 1).unwrap();
        assert_eq!(*log.deleted.borrow(), [2, 0]);
        assert_eq!(ids(&view), ["b"]);
    }

    #[test]
    fn test_remove_at_out_of_range_sends_nothing() {
        let log = oldest_first_log();
        let mut view = HistoryView::new();
        view.refresh(&log).unwrap();

        let err = view.remove_at(&log, 3).unwrap_err();
        assert_eq!(err, HistoryError::Position { position: 3, len: 3 });
        assert!(log.deleted.borrow().is_empty());
    }

    #[test]
    fn test_remove_at_with_failed_reload_keeps_local_removal() {
        let log = oldest_first_log();
        let mut view = HistoryView::new();
        view.refresh(&log).unwrap();

        *log.fail_fetch.borrow_mut() = true;
        let err = view.remove_at(&log, 1).unwrap_err();
        assert!(matches!(err, HistoryError::Fetch(_)));
        assert_eq!(ids(&view), ["c", "a"]);
        assert!(!view.is_fresh());

        // later deletes still address the right server rows
        *log.fail_fetch.borrow_mut() = false;
        view.remove_at(&log, 1).unwrap();
        assert_eq!(*log.deleted.borrow(), [1, 0]);
        assert_eq!(ids(&view), ["c"]);
    }

    #[test]
    fn test_stale_refresh_is_discarded() {
        let log = oldest_first_log();
        let mut view = HistoryView::new();

        let first = view.begin_refresh();
        let second = view.begin_refresh();
        let newer = Ok(vec![HistoryEntry::from_value(&entry("2024-01-01T00:00:00", "z"))]);
        assert_eq!(view.apply_refresh(second, newer).unwrap(), RefreshOutcome::Applied);

        let older = log.fetch_history();
        assert_eq!(view.apply_refresh(first, older).unwrap(), RefreshOutcome::Superseded);
        assert_eq!(ids(&view), ["z"]);
    }

    #[test]
    fn test_failed_fetch_keeps_cache() {
        let log = oldest_first_log();
        let mut view = HistoryView::new();
        view.refresh(&log).unwrap();

        *log.fail_fetch.borrow_mut() = true;
        assert!(matches!(view.refresh(&log), Err(HistoryError::Fetch(_))));
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_clear_empties_both_sides() {
        let log = oldest_first_log();
        let mut view = HistoryView::new();
        view.refresh(&log).unwrap();
        view.clear(&log).unwrap();
        assert!(view.is_empty());
        assert!(log.items.borrow().is_empty());
    }

    #[test]
    fn test_parse_history_body_repairs_whole_body() {
        let body = r#"[{"time":"2023-01-01T00:00:00","operation":"UPDATE","data":{"SBD":5,"Year":NaN}}]"#;
        let entries = parse_history_body(body).unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0].payload {
            crate::model::RawPayload::Structured(map) => assert_eq!(map["Year"], Value::Null),
            other => panic!("expected structured payload, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_history_body_envelope_and_errors() {
        assert_eq!(parse_history_body(r#"{"data":[{"operation":"FINISH"}]}"#).unwrap().len(), 1);
        assert!(matches!(parse_history_body(r#"{"rows":[]}"#), Err(GatewayError::Decode(_))));
        assert!(matches!(parse_history_body("[{"), Err(GatewayError::Decode(_))));
    }
}

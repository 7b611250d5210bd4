//! End-to-end flows against an in-memory record store.
//! Run with: cargo test -p examdesk-wizard --test wizard_flow

use std::cell::RefCell;

use examdesk_gateway::{ChangeSet, EntityDraft, GatewayError, StudentRecord};
use examdesk_wizard::{
    lookup, BatchWizard, CommitError, Lookup, Phase, RecordStore, UpdateSession, WizardError,
    WizardKind,
};
use proptest::prelude::*;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(String),
    Delete(String, String),
    Update(String, String, Value),
}

#[derive(Default)]
struct FakeStore {
    calls: RefCell<Vec<Call>>,
    /// Number of mutation calls that succeed before every later one fails.
    fail_after: RefCell<Option<usize>>,
    records: Vec<Value>,
    offline: bool,
}

impl FakeStore {
    fn with_records(records: Vec<Value>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    fn record(&self, call: Call) -> Result<(), GatewayError> {
        let mut calls = self.calls.borrow_mut();
        let failing = matches!(*self.fail_after.borrow(), Some(limit) if calls.len() >= limit);
        calls.push(call);
        if failing {
            Err(GatewayError::Api {
                status: 500,
                message: "boom".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl RecordStore for FakeStore {
    fn create(&self, draft: &EntityDraft) -> Result<(), GatewayError> {
        self.record(Call::Create(draft.get("SBD").unwrap_or_default().to_string()))
    }

    fn fetch(&self, id: &str) -> Result<Vec<StudentRecord>, GatewayError> {
        if self.offline {
            return Err(GatewayError::Network("connection refused".into()));
        }
        Ok(self
            .records
            .iter()
            .filter(|r| r["Số Báo Danh"] == json!(id))
            .map(|r| StudentRecord(r.as_object().unwrap().clone()))
            .collect())
    }

    fn update(&self, id: &str, year: &str, changes: &ChangeSet) -> Result<(), GatewayError> {
        self.record(Call::Update(
            id.to_string(),
            year.to_string(),
            Value::Object(changes.as_map().clone()),
        ))
    }

    fn delete(&self, id: &str, year: &str) -> Result<(), GatewayError> {
        self.record(Call::Delete(id.to_string(), year.to_string()))
    }
}

fn staged_create(ids: &[&str]) -> BatchWizard {
    let mut w = BatchWizard::new(WizardKind::Create);
    w.size(ids.len()).unwrap();
    for id in ids {
        w.set_field("SBD", *id).unwrap();
        w.set_field("Year", "2020").unwrap();
        w.next().unwrap();
    }
    w
}

#[test]
fn create_batch_commits_in_order() {
    let store = FakeStore::default();
    let mut w = staged_create(&["1", "2", "3"]);
    assert_eq!(w.phase(), Phase::ReadyToCommit);

    // commit never runs without confirm
    assert!(matches!(w.commit(&store), Err(WizardError::InvalidTransition { .. })));
    assert!(store.calls.borrow().is_empty());

    w.confirm().unwrap();
    assert_eq!(w.commit(&store).unwrap(), 3);
    assert_eq!(w.phase(), Phase::Done);
    assert_eq!(
        *store.calls.borrow(),
        [
            Call::Create("1".into()),
            Call::Create("2".into()),
            Call::Create("3".into())
        ]
    );
}

#[test]
fn failure_halts_and_resume_skips_committed() {
    let store = FakeStore::default();
    *store.fail_after.borrow_mut() = Some(1);
    let mut w = staged_create(&["1", "2", "3"]);
    w.confirm().unwrap();

    let err = w.commit(&store).unwrap_err();
    match err {
        WizardError::Commit(CommitError { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected commit error, got {other:?}"),
    }
    assert_eq!(w.phase(), Phase::Failed { index: 1 });
    assert_eq!(w.committed(), 1);
    assert_eq!(store.calls.borrow().len(), 2);

    *store.fail_after.borrow_mut() = None;
    w.confirm().unwrap();
    assert_eq!(w.commit(&store).unwrap(), 2);
    let calls = store.calls.borrow();
    assert_eq!(
        calls[2..],
        [Call::Create("2".into()), Call::Create("3".into())]
    );
}

#[test]
fn delete_batch_rejects_missing_year() {
    let mut w = BatchWizard::new(WizardKind::Delete);
    w.size(2).unwrap();
    w.set_field("SBD", "A1").unwrap();
    w.set_field("Year", "2019").unwrap();
    w.next().unwrap();

    w.set_field("SBD", "A2").unwrap();
    let err = w.next().unwrap_err();
    assert!(matches!(err, WizardError::Validation { ref field, .. } if field == "Year"));
    assert_eq!(w.staged().len(), 1);
    assert_eq!(w.index(), 1);
    assert_eq!(w.current_draft().get("SBD"), Some("A2"));

    w.set_field("Year", "2020").unwrap();
    w.next().unwrap();
    assert!(w.requires_confirmation());
    w.confirm().unwrap();

    let store = FakeStore::default();
    w.commit(&store).unwrap();
    assert_eq!(
        *store.calls.borrow(),
        [
            Call::Delete("A1".into(), "2019".into()),
            Call::Delete("A2".into(), "2020".into())
        ]
    );
}

#[test]
fn lookup_filters_by_year_and_reports_not_found() {
    let store = FakeStore::with_records(vec![
        json!({"Số Báo Danh": "A1", "Năm": 2018, "Toán": 7}),
        json!({"Số Báo Danh": "A1", "Năm": 2019, "Toán": 8}),
    ]);

    assert_eq!(lookup(&store, "A1", None).unwrap().records().len(), 2);
    assert_eq!(lookup(&store, "A1", Some("")).unwrap().records().len(), 2);

    let found = lookup(&store, "A1", Some("2019")).unwrap();
    assert_eq!(found.records()[0].get("Toán"), Some(&json!(8)));

    assert_eq!(lookup(&store, "A1", Some("2020")).unwrap(), Lookup::NotFound);
    assert_eq!(lookup(&store, "ZZ", None).unwrap(), Lookup::NotFound);
    assert!(matches!(lookup(&store, "  ", None), Err(WizardError::Validation { .. })));
}

#[test]
fn update_not_found_is_not_a_network_error() {
    let store = FakeStore::with_records(vec![json!({"Số Báo Danh": "A1", "Năm": 2018})]);
    let mut session = UpdateSession::new();
    assert_eq!(session.search(&store, "A1", "2019").unwrap(), Lookup::NotFound);
    assert!(session.original().is_none());

    let offline = FakeStore {
        offline: true,
        ..FakeStore::default()
    };
    let err = session.search(&offline, "A1", "2019").unwrap_err();
    assert!(matches!(err, WizardError::Gateway(GatewayError::Network(_))));
}

#[test]
fn update_sends_coerced_record_to_searched_key() {
    let store = FakeStore::with_records(vec![json!({
        "Số Báo Danh": "A1", "Năm": 2019, "Toán": 7.5, "Văn": 6, "MaTinh": "01"
    })]);
    let mut session = UpdateSession::new();
    assert!(matches!(
        session.search(&store, "A1", " 2019 ").unwrap(),
        Lookup::Found(_)
    ));

    session.set_field("Toán", "9").unwrap();
    session.set_field("Văn", "").unwrap();
    session.set_field("Năm", "2021").unwrap();
    assert!(session.set_field("Nope", "1").is_err());

    session.submit(&store).unwrap();
    assert_eq!(
        *store.calls.borrow(),
        [Call::Update(
            "A1".into(),
            "2019".into(),
            json!({"Số Báo Danh": "A1", "Năm": "2021", "Toán": 9, "Văn": null, "MaTinh": "01"})
        )]
    );
}

#[test]
fn update_rejects_non_numeric_score() {
    let store = FakeStore::with_records(vec![json!({"Số Báo Danh": "A1", "Năm": 2019, "Lý": 5})]);
    let mut session = UpdateSession::new();
    session.search(&store, "A1", "2019").unwrap();
    session.set_field("Lý", "five").unwrap();
    let err = session.submit(&store).unwrap_err();
    assert!(matches!(err, WizardError::Validation { ref field, .. } if field == "Lý"));
    assert!(store.calls.borrow().is_empty());
}

proptest! {
    #[test]
    fn commit_issues_exactly_the_staged_prefix(n in 1usize..12, fail in proptest::option::of(0usize..12)) {
        let ids: Vec<String> = (0..n).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut w = staged_create(&refs);
        prop_assert_eq!(w.index(), n);
        prop_assert_eq!(w.staged().len(), w.target());

        let store = FakeStore::default();
        *store.fail_after.borrow_mut() = fail;
        w.confirm().unwrap();
        let result = w.commit(&store);

        let calls = store.calls.borrow();
        match fail {
            Some(k) if k < n => {
                prop_assert!(result.is_err());
                prop_assert_eq!(calls.len(), k + 1);
                prop_assert_eq!(w.phase(), Phase::Failed { index: k });
            }
            _ => {
                prop_assert_eq!(result.unwrap(), n);
                prop_assert_eq!(calls.len(), n);
            }
        }
        for (i, call) in calls.iter().enumerate() {
            prop_assert_eq!(call, &Call::Create(i.to_string()));
        }
    }
}

//! Property tests for reconciliation.
//! Run with: cargo test -p examdesk-history --test reconcile_props

use examdesk_history::{
    reconcile, reconcile_with_warnings, repair_non_finite, HistoryEntry, NormalizedHistoryEntry,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn time_text() -> impl Strategy<Value = String> {
    prop_oneof![
        (2015u32..2025, 1u32..13, 1u32..29, 0u32..24, 0u32..60)
            .prop_map(|(y, mo, d, h, mi)| format!("{y}-{mo:02}-{d:02}T{h:02}:{mi:02}:00")),
        (2015u32..2025, 1u32..13, 1u32..29).prop_map(|(y, mo, d)| format!("{y}-{mo:02}-{d:02}")),
        Just(String::new()),
        "[a-z ]{1,8}",
    ]
}

fn payload() -> impl Strategy<Value = Value> {
    let number = prop_oneof![
        Just("NaN".to_string()),
        Just("Infinity".to_string()),
        Just("-Infinity".to_string()),
        (0u32..1000).prop_map(|n| n.to_string()),
    ];
    prop_oneof![
        Just(Value::Null),
        (0u32..9999, 2015u32..2025).prop_map(|(sbd, year)| json!({"SBD": sbd, "Year": year})),
        (0u32..9999, number.clone())
            .prop_map(|(sbd, year)| Value::String(format!("{{\"SBD\":{sbd},\"Year\":{year}}}"))),
        "[{}\\[\\],:a-z0-9\"]{0,12}".prop_map(Value::String),
        Just(json!([1, 2])),
    ]
}

fn operation() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("CREATE".to_string()),
        Just("READ".to_string()),
        Just("UPDATE".to_string()),
        Just("DELETE".to_string()),
        Just("FINISH".to_string()),
        Just("CLEAN".to_string()),
        "[A-Z]{3,6}",
    ]
}

fn raw_entries() -> impl Strategy<Value = Vec<HistoryEntry>> {
    prop::collection::vec(
        (time_text(), operation(), payload()).prop_map(|(time, op, data)| {
            HistoryEntry::from_value(&json!({"time": time, "operation": op, "data": data}))
        }),
        0..24,
    )
}

fn is_newest_first(entries: &[NormalizedHistoryEntry]) -> bool {
    entries.windows(2).all(|pair| {
        match (pair[0].time.instant(), pair[1].time.instant()) {
            (Some(a), Some(b)) => a >= b,
            (None, Some(_)) => false,
            _ => true,
        }
    })
}

proptest! {
    #[test]
    fn every_entry_survives(raw in raw_entries()) {
        let out = reconcile_with_warnings(&raw);
        prop_assert_eq!(out.entries.len(), raw.len());

        let mut origins = out.origins.clone();
        origins.sort_unstable();
        prop_assert_eq!(origins, (0..raw.len()).collect::<Vec<_>>());
    }

    #[test]
    fn output_is_newest_first(raw in raw_entries()) {
        prop_assert!(is_newest_first(&reconcile(&raw)));
    }

    #[test]
    fn reconcile_is_idempotent(raw in raw_entries()) {
        let once = reconcile(&raw);
        let again: Vec<HistoryEntry> = once.iter().cloned().map(HistoryEntry::from).collect();
        prop_assert_eq!(reconcile(&again), once);
    }

    #[test]
    fn repaired_text_never_keeps_sentinels_outside_strings(sbd in 0u32..9999, pick in 0usize..3) {
        let literal = ["NaN", "Infinity", "-Infinity"][pick];
        let text = format!("{{\"SBD\":{sbd},\"Year\":{literal},\"note\":\"{literal}\"}}");
        let repaired = repair_non_finite(&text);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        prop_assert_eq!(&value["Year"], &Value::Null);
        prop_assert_eq!(&value["note"], &json!(literal));
    }
}

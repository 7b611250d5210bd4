use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use examdesk_gateway::value_text;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Kind of audited operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    /// Export of the updated dataset.
    Finish,
    /// Server-side dataset cleaning.
    Clean,
    /// Anything the server logs that this client does not know about.
    Other(String),
}

impl Operation {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Self::Create,
            "READ" => Self::Read,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "FINISH" => Self::Finish,
            "CLEAN" => Self::Clean,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Finish => "FINISH",
            Self::Clean => "CLEAN",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Entry timestamp as the server wrote it.
///
/// Accepts RFC 3339 and offset-less ISO forms (`2023-01-01T10:00:00.123`,
/// `2023-01-01 10:00:00`, `2023-01-01`). Offset-less times are taken as UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTime {
    raw: String,
}

impl EntryTime {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// UTC instant used for ordering. `None` when the text is not a time.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        self.parse().map(|(utc, _)| utc)
    }

    /// Wall-clock time as written (in the entry's own offset).
    pub fn wall_clock(&self) -> Option<NaiveDateTime> {
        self.parse().map(|(_, wall)| wall)
    }

    fn parse(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let s = self.raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some((dt.naive_utc(), dt.naive_local()));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some((naive, naive));
            }
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        Some((midnight, midnight))
    }
}

impl Serialize for EntryTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// Raw entries
// ---------------------------------------------------------------------------

/// Payload of an audit entry before reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Structured(Map<String, Value>),
    /// Serialized record text, possibly with non-finite literals.
    Text(String),
    Absent,
    /// A JSON value that cannot be a record (number, array, bool).
    Unsupported(Value),
}

/// One audit entry exactly as fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub time: EntryTime,
    pub operation: Operation,
    pub payload: RawPayload,
    /// Identifier looked up by a READ.
    pub queried_identifier: Option<String>,
}

impl HistoryEntry {
    /// Decode one element of the history array. Never fails: unusable parts
    /// become empty/absent so the entry stays visible.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self {
                time: EntryTime::new(""),
                operation: Operation::Other(String::new()),
                payload: RawPayload::Unsupported(value.clone()),
                queried_identifier: None,
            };
        };

        let time = obj.get("time").and_then(value_text).unwrap_or_default();
        let operation = obj
            .get("operation")
            .and_then(Value::as_str)
            .map(Operation::parse)
            .unwrap_or_else(|| Operation::Other(String::new()));
        let payload = match obj.get("data").or_else(|| obj.get("payload")) {
            None | Some(Value::Null) => RawPayload::Absent,
            Some(Value::Object(map)) => RawPayload::Structured(map.clone()),
            Some(Value::String(text)) => RawPayload::Text(text.clone()),
            Some(other) => RawPayload::Unsupported(other.clone()),
        };
        let queried_identifier = obj.get("sbd").and_then(value_text);

        Self {
            time: EntryTime::new(time),
            operation,
            payload,
            queried_identifier,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized entries
// ---------------------------------------------------------------------------

/// An audit entry whose payload is a record or explicitly absent.
///
/// Inside `payload`, JSON `null` is the "missing" marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedHistoryEntry {
    pub time: EntryTime,
    pub operation: Operation,
    pub payload: Option<Map<String, Value>>,
    pub queried_identifier: Option<String>,
}

impl From<NormalizedHistoryEntry> for HistoryEntry {
    fn from(entry: NormalizedHistoryEntry) -> Self {
        Self {
            time: entry.time,
            operation: entry.operation,
            payload: match entry.payload {
                Some(map) => RawPayload::Structured(map),
                None => RawPayload::Absent,
            },
            queried_identifier: entry.queried_identifier,
        }
    }
}

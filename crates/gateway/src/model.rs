use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Field schema
// ---------------------------------------------------------------------------

/// Identifier field of a draft.
pub const FIELD_ID: &str = "SBD";
/// Exam year field of a draft.
pub const FIELD_YEAR: &str = "Year";

/// Identifier key as stored by the server.
pub const RECORD_ID_KEY: &str = "Số Báo Danh";
/// Year key as stored by the server.
pub const RECORD_YEAR_KEY: &str = "Năm";

/// The nine subject score columns.
pub const SUBJECT_FIELDS: [&str; 9] = [
    "Toán", "Văn", "Lý", "Hóa", "Sinh", "Ngoại ngữ", "Lịch sử", "Địa lý", "GDCD",
];

/// Fields collected per record by the create flow, in form order.
pub const CREATE_FIELDS: [&str; 12] = [
    "SBD", "Toán", "Văn", "Lý", "Sinh", "Ngoại ngữ", "Year", "Hóa", "Lịch sử", "Địa lý", "GDCD",
    "MaTinh",
];

/// Fields collected per record by the delete flow.
pub const DELETE_FIELDS: [&str; 2] = [FIELD_ID, FIELD_YEAR];

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// One record being typed in: a fixed, ordered set of string fields.
///
/// The field set is chosen at construction time; `set` refuses names outside
/// it so a typo never reaches the server as an extra column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDraft {
    fields: Vec<(String, String)>,
}

impl EntityDraft {
    /// Draft with every field present and empty.
    pub fn with_fields(names: &[&str]) -> Self {
        Self {
            fields: names.iter().map(|n| (n.to_string(), String::new())).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a field value. Returns false if the draft has no such field.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => {
                *v = value.into();
                true
            }
            None => false,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every field is blank.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.trim().is_empty())
    }
}

impl Serialize for EntityDraft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A record as returned by `GET /students/{id}`.
///
/// The column set is owned by the server, so the record stays an open
/// object and only the key columns get typed accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentRecord(pub Map<String, Value>);

impl StudentRecord {
    pub fn identifier(&self) -> Option<String> {
        self.text_of(RECORD_ID_KEY).or_else(|| self.text_of(FIELD_ID))
    }

    pub fn year(&self) -> Option<String> {
        self.text_of(RECORD_YEAR_KEY).or_else(|| self.text_of(FIELD_YEAR))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    fn text_of(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(value_text)
    }
}

/// Keep only records whose year matches `year` textually (`2018` == `"2018"`).
pub fn filter_by_year(records: Vec<StudentRecord>, year: &str) -> Vec<StudentRecord> {
    let year = year.trim();
    records
        .into_iter()
        .filter(|r| r.year().as_deref() == Some(year))
        .collect()
}

/// Render a scalar JSON value as display text.
///
/// Returns `None` for null and blank strings. Whole floats print without a
/// fractional part (`2018.0` -> `2018`).
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        return Some(format!("{}", f as i64));
                    }
                }
            }
            Some(n.to_string())
        }
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// Partial field changes sent with `PUT /students/{id}/{year}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(Map<String, Value>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Province lookup row from `GET /tinh-data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    #[serde(rename = "MaTinh", deserialize_with = "de_text")]
    pub code: String,
    #[serde(rename = "TenTinh")]
    pub name: String,
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(&value).unwrap_or_default())
}

/// Chart aggregate endpoints. Data is returned verbatim for an external renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Area,
    Histogram { subject: String, year: String },
    Heatmap { year: String },
}

impl ChartKind {
    /// Path segments under the API base.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Bar => vec!["chart", "bar"],
            Self::Line => vec!["chart", "line"],
            Self::Pie => vec!["chart", "pie"],
            Self::Area => vec!["chart", "area"],
            Self::Histogram { subject, year } => vec!["chart", "histogram", subject, year],
            Self::Heatmap { year } => vec!["chart", "heatmap", year],
        }
    }
}

//! Display text for history rows.
//!
//! | operation | summary                                     | no payload          |
//! |-----------|---------------------------------------------|---------------------|
//! | CREATE    | `Thêm thí sinh SBD: {id}, Năm: {year}`      | `Thêm thí sinh mới` |
//! | READ      | `Xem thí sinh SBD: {sbd}`                   | `Xem thí sinh`      |
//! | UPDATE    | id/year, falling back to `old.*`            | `Cập nhật thí sinh` |
//! | DELETE    | `Xóa thí sinh SBD: {id}, Năm: {year}`       | `Xóa thí sinh`      |
//! | FINISH    | `Đã tạo file Updated_Data.csv`              |                     |
//! | CLEAN     | `Làm sạch dữ liệu từ {source}`              | `Làm sạch dữ liệu`  |
//! | other     | `Không có thông tin chi tiết`               |                     |
//!
//! A missing field, a `null` (repaired sentinel) and a blank string all
//! render as [`NOT_AVAILABLE`].

use serde_json::{Map, Value};

use examdesk_gateway::{value_text, CleanSource, UPDATED_DATA_FILE};

use crate::model::{EntryTime, NormalizedHistoryEntry, Operation};

pub const NOT_AVAILABLE: &str = "N/A";

const ID_KEYS: [&str; 2] = ["SBD", "Số Báo Danh"];
const YEAR_KEYS: [&str; 2] = ["Year", "Năm"];
const PREVIOUS_KEY: &str = "old";
const SOURCE_KEYS: [&str; 3] = ["sourceChoice", "source_choice", "choice"];

/// One-line description of what the entry recorded.
pub fn summarize(entry: &NormalizedHistoryEntry) -> String {
    let payload = entry.payload.as_ref();
    match &entry.operation {
        Operation::Create => match payload {
            Some(p) => format!(
                "Thêm thí sinh SBD: {}, Năm: {}",
                or_na(field(p, &ID_KEYS)),
                or_na(field(p, &YEAR_KEYS)),
            ),
            None => "Thêm thí sinh mới".to_string(),
        },
        Operation::Read => match &entry.queried_identifier {
            Some(sbd) => format!("Xem thí sinh SBD: {sbd}"),
            None => "Xem thí sinh".to_string(),
        },
        Operation::Update => match payload {
            Some(p) => {
                let previous = p.get(PREVIOUS_KEY).and_then(Value::as_object);
                let id = field(p, &ID_KEYS).or_else(|| previous.and_then(|o| field(o, &ID_KEYS)));
                let year =
                    field(p, &YEAR_KEYS).or_else(|| previous.and_then(|o| field(o, &YEAR_KEYS)));
                format!("Cập nhật thí sinh SBD: {}, Năm: {}", or_na(id), or_na(year))
            }
            None => "Cập nhật thí sinh".to_string(),
        },
        Operation::Delete => match payload {
            Some(p) => format!(
                "Xóa thí sinh SBD: {}, Năm: {}",
                or_na(field(p, &ID_KEYS)),
                or_na(field(p, &YEAR_KEYS)),
            ),
            None => "Xóa thí sinh".to_string(),
        },
        Operation::Finish => format!("Đã tạo file {UPDATED_DATA_FILE}"),
        Operation::Clean => match payload {
            Some(p) => {
                let source = field(p, &SOURCE_KEYS).map(|choice| match choice.parse::<CleanSource>() {
                    Ok(source) => source.label().to_string(),
                    Err(_) => choice,
                });
                format!("Làm sạch dữ liệu từ {}", or_na(source))
            }
            None => "Làm sạch dữ liệu".to_string(),
        },
        Operation::Other(_) => "Không có thông tin chi tiết".to_string(),
    }
}

/// Short label for the operation column.
pub fn operation_label(operation: &Operation) -> &str {
    match operation {
        Operation::Create => "Thêm mới",
        Operation::Read => "Xem",
        Operation::Update => "Cập nhật",
        Operation::Delete => "Xóa",
        Operation::Finish => "Hoàn tất CRUD",
        Operation::Clean => "Làm sạch dữ liệu",
        Operation::Other(raw) => raw,
    }
}

/// `HH:MM:SS D/M/YYYY`, or the raw text when it is not a timestamp.
pub fn display_time(time: &EntryTime) -> String {
    match time.wall_clock() {
        Some(wall) => wall.format("%H:%M:%S %-d/%-m/%Y").to_string(),
        None => time.raw().to_string(),
    }
}

fn field(payload: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| payload.get(*k).and_then(value_text))
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HistoryEntry;
    use crate::reconcile::reconcile;
    use serde_json::json;

    fn summary_of(value: Value) -> String {
        let entries = reconcile(&[HistoryEntry::from_value(&value)]);
        summarize(&entries[0])
    }

    #[test]
    fn test_update_with_sentinel_year() {
        assert_eq!(
            summary_of(json!({
                "time": "2023-01-01T00:00:00Z",
                "operation": "UPDATE",
                "data": "{\"SBD\":123,\"Year\":NaN}"
            })),
            "Cập nhật thí sinh SBD: 123, Năm: N/A"
        );
    }

    #[test]
    fn test_update_falls_back_to_previous_record() {
        assert_eq!(
            summary_of(json!({
                "operation": "UPDATE",
                "data": {"Toán": 9, "old": {"SBD": "A1", "Year": 2018}}
            })),
            "Cập nhật thí sinh SBD: A1, Năm: 2018"
        );
    }

    #[test]
    fn test_create_and_delete() {
        assert_eq!(
            summary_of(json!({"operation": "CREATE", "data": {"SBD": "A1", "Year": "2019"}})),
            "Thêm thí sinh SBD: A1, Năm: 2019"
        );
        assert_eq!(
            summary_of(json!({"operation": "CREATE"})),
            "Thêm thí sinh mới"
        );
        assert_eq!(
            summary_of(json!({"operation": "DELETE", "data": {"Số Báo Danh": 77, "Năm": ""}})),
            "Xóa thí sinh SBD: 77, Năm: N/A"
        );
        assert_eq!(summary_of(json!({"operation": "DELETE", "data": "{broken"})), "Xóa thí sinh");
    }

    #[test]
    fn test_read_finish_clean_other() {
        assert_eq!(summary_of(json!({"operation": "READ", "sbd": "A1"})), "Xem thí sinh SBD: A1");
        assert_eq!(summary_of(json!({"operation": "READ"})), "Xem thí sinh");
        assert_eq!(summary_of(json!({"operation": "FINISH"})), "Đã tạo file Updated_Data.csv");
        assert_eq!(
            summary_of(json!({"operation": "CLEAN", "data": {"choice": "2"}})),
            "Làm sạch dữ liệu từ Raw Data"
        );
        assert_eq!(
            summary_of(json!({"operation": "CLEAN", "data": {"sourceChoice": null}})),
            "Làm sạch dữ liệu từ N/A"
        );
        assert_eq!(summary_of(json!({"operation": "CLEAN"})), "Làm sạch dữ liệu");
        assert_eq!(summary_of(json!({"operation": "EXPORT"})), "Không có thông tin chi tiết");
    }

    #[test]
    fn test_labels_and_time() {
        assert_eq!(operation_label(&Operation::Finish), "Hoàn tất CRUD");
        assert_eq!(operation_label(&Operation::Other("EXPORT".into())), "EXPORT");
        assert_eq!(display_time(&EntryTime::new("2023-01-05T14:03:09Z")), "14:03:09 5/1/2023");
        assert_eq!(display_time(&EntryTime::new("soon")), "soon");
    }
}

//! Helpers for printing records as a compact table.

use serde_json::Value;

/// Fields tried, in order, for a record's display title.
const TITLE_FIELDS: &[&str] = &["title", "name", "page_name", "activity_type", "file_name"];

/// Fields tried, in order, for a record's display date.
const DATE_FIELDS: &[&str] = &[
    "date",
    "start_date",
    "event_date",
    "published_date",
    "evaluation_date",
    "activity_date",
    "issue_date",
    "updated_at",
    "created_at",
];

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(day) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        day.format("%b %d, %Y").to_string()
    } else {
        date.to_string()
    }
}

fn first_str<'a>(record: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|f| record.get(*f).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// One line per record: id, date, title.
pub fn table_row(record: &Value) -> String {
    let id = first_str(record, &["id"]).unwrap_or("-");
    let date = first_str(record, DATE_FIELDS)
        .map(format_date)
        .unwrap_or_default();
    let title = first_str(record, TITLE_FIELDS).unwrap_or("");
    format!(
        "{:<38} {:<13} {}",
        truncate_string(id, 38),
        date,
        truncate_string(title, 60)
    )
}

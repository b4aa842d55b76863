use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Column order for persisted collections. Extra columns follow these.
pub const CORE_COLUMNS: [&str; 5] = ["title", "broadcast_date", "broadcast_start", "hls_url", "get"];

/// One on-demand episode. `hls_url` is the natural key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub title: String,
    pub broadcast_date: String,
    pub broadcast_start: String,
    pub hls_url: String,
    pub get: i64,
    /// Columns found in a persisted file beyond the core five. JSON keeps the
    /// original value type; CSV cells arrive as strings.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record {
    /// Build a record from named fields, as read from a CSV row or a JSON object.
    /// Unknown names land in `extra` untouched; core fields are read as text and `get` is coerced.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Record::default();
        for (name, value) in fields {
            let value = value.into();
            match name.as_ref() {
                "title" => record.title = value_text(&value),
                "broadcast_date" => record.broadcast_date = value_text(&value),
                "broadcast_start" => record.broadcast_start = value_text(&value),
                "hls_url" => record.hls_url = value_text(&value).trim().to_string(),
                "get" => record.get = coerce_get(&value_text(&value)),
                other => {
                    record.extra.insert(other.to_string(), value);
                }
            }
        }
        record
    }

    pub fn has_key(&self) -> bool {
        !self.hls_url.is_empty()
    }

    /// Value of a column by name; extras missing on this record read as empty.
    pub fn field(&self, name: &str) -> String {
        match name {
            "title" => self.title.clone(),
            "broadcast_date" => self.broadcast_date.clone(),
            "broadcast_start" => self.broadcast_start.clone(),
            "hls_url" => self.hls_url.clone(),
            "get" => self.get.to_string(),
            other => self.extra.get(other).map(value_text).unwrap_or_default(),
        }
    }
}

/// Text form of a value for CSV cells and core fields. Null is empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether a value counts as set when overlaying one record on another.
pub fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Coerce a persisted `get` value to an integer. Blank or garbage is 0.
pub fn coerce_get(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => 0,
    }
}

/// Column list for a collection: core columns, then extras in first-seen order.
pub fn columns(records: &[Record]) -> Vec<String> {
    let mut cols: Vec<String> = CORE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for record in records {
        for key in record.extra.keys() {
            if !cols.iter().any(|c| c == key) {
                cols.push(key.clone());
            }
        }
    }
    cols
}

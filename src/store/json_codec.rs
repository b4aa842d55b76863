use serde_json::Value;

use super::StoreError;
use crate::record::Record;

/// Read a JSON array of objects. Non-object entries are skipped; extra keys keep their JSON type.
pub fn decode(text: &str) -> Result<Vec<Record>, StoreError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<Value> = serde_json::from_str(text)?;
    let records = entries
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| Record::from_fields(obj.iter().map(|(k, v)| (k, v.clone()))))
        .collect();
    Ok(records)
}

/// Pretty-printed array, core keys first.
pub fn encode(records: &[Record]) -> Result<String, StoreError> {
    let mut text = serde_json::to_string_pretty(records)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_mixed_value_types() {
        let text = r#"[
            {"hls_url": "https://x/a.m3u8", "title": "A", "get": 1, "rating": 4.5},
            {"hls_url": "https://x/b.m3u8", "title": null, "get": "2"},
            {"hls_url": "https://x/c.m3u8", "get": "n/a"},
            "not an object"
        ]"#;
        let records = decode(text).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get, 1);
        assert_eq!(records[0].extra.get("rating"), Some(&serde_json::json!(4.5)));
        assert_eq!(records[1].title, "");
        assert_eq!(records[1].get, 2);
        assert_eq!(records[2].get, 0);
    }

    #[test]
    fn typed_extras_survive_a_rewrite() {
        let records = decode(r#"[{"hls_url":"A","get":1,"tags":["x","y"],"rating":4.5}]"#).unwrap();
        let text = encode(&records).unwrap();
        assert!(text.contains("\"rating\": 4.5"), "{}", text);
        assert!(text.contains("\"tags\": [\n      \"x\",\n      \"y\"\n    ]"), "{}", text);

        let again: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(again[0]["tags"], serde_json::json!(["x", "y"]));
        assert_eq!(again[0]["get"], serde_json::json!(1));
    }

    #[test]
    fn empty_input_is_empty_collection() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("[]").unwrap().is_empty());
        assert!(decode("{\"hls_url\": 1}").is_err());
    }

    #[test]
    fn writes_indented_objects_with_integer_get() {
        let mut rec = Record {
            title: "A".into(),
            hls_url: "https://x/a.m3u8".into(),
            get: 1,
            ..Default::default()
        };
        rec.extra.insert("note".into(), "n".into());

        let text = encode(&[rec.clone()]).unwrap();
        assert!(text.starts_with("[\n  {\n    \"title\": \"A\","));
        assert!(text.contains("\"get\": 1,"));
        assert!(text.contains("\"note\": \"n\""));

        let title_at = text.find("\"title\"").unwrap();
        let url_at = text.find("\"hls_url\"").unwrap();
        assert!(title_at < url_at);

        assert_eq!(decode(&text).unwrap(), vec![rec]);
    }
}

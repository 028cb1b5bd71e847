// src/convert.rs

//! Conversion between plist values and their JSON transport form
//!
//! JSON has no date or binary type. Dates become ISO-8601 strings
//! (`2024-01-31T12:00:00Z`) and `<data>` becomes base64. Going the other
//! way, a string becomes a date only under a dictionary key containing
//! `date` (any case) and only when it looks like an ISO timestamp. JSON
//! `null` has no plist counterpart and is dropped.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, NaiveDateTime, Utc};
use plist::{Dictionary, Value};
use regex::Regex;
use serde_json::{Map, Number, Value as Json};
use std::sync::LazyLock;
use std::time::SystemTime;

static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-[01]\d-[0-3]\dT[0-2]\d:[0-5]\d:[0-5]\dZ*$").expect("date regex is valid")
});

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format a plist date as an ISO-8601 UTC string
pub fn date_to_string(date: &plist::Date) -> String {
    let time: DateTime<Utc> = SystemTime::from(*date).into();
    time.format(ISO_FORMAT).to_string()
}

/// Parse an ISO timestamp as produced by [`date_to_string`]
pub fn string_to_date(text: &str) -> Option<plist::Date> {
    if !ISO_DATE_RE.is_match(text) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(text.get(..19)?, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(plist::Date::from(SystemTime::from(naive.and_utc())))
}

/// JSON form of a plist value
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::String(s.clone()),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(i) => match (i.as_signed(), i.as_unsigned()) {
            (Some(n), _) => Json::Number(n.into()),
            (None, Some(n)) => Json::Number(n.into()),
            (None, None) => Json::Null,
        },
        Value::Real(r) => Number::from_f64(*r).map(Json::Number).unwrap_or(Json::Null),
        Value::Date(date) => Json::String(date_to_string(date)),
        Value::Data(bytes) => Json::String(BASE64.encode(bytes)),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Dictionary(dict) => Json::Object(dict_to_json(dict)),
        _ => Json::Null,
    }
}

/// JSON object form of a plist dictionary
pub fn dict_to_json(dict: &Dictionary) -> Map<String, Json> {
    dict.iter()
        .map(|(key, value)| (key.clone(), to_json(value)))
        .collect()
}

/// Plist form of a JSON value; `None` for `null`
pub fn from_json(json: &Json) -> Option<Value> {
    match json {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Boolean(*b)),
        Json::Number(n) => Some(if let Some(i) = n.as_i64() {
            Value::from(i)
        } else if let Some(u) = n.as_u64() {
            Value::from(u)
        } else {
            Value::Real(n.as_f64().unwrap_or_default())
        }),
        Json::String(s) => Some(Value::String(s.clone())),
        // Dates inside lists are not detected
        Json::Array(items) => Some(Value::Array(items.iter().filter_map(from_json).collect())),
        Json::Object(map) => Some(Value::Dictionary(object_to_dict(map))),
    }
}

/// Plist dictionary from a JSON object, converting date-like strings
pub fn object_to_dict(map: &Map<String, Json>) -> Dictionary {
    let mut dict = Dictionary::new();
    for (key, json) in map {
        let date = match json {
            Json::String(s) if key.to_lowercase().contains("date") => string_to_date(s),
            _ => None,
        };
        let value = match date {
            Some(date) => Some(Value::Date(date)),
            None => from_json(json),
        };
        if let Some(value) = value {
            dict.insert(key.clone(), value);
        }
    }
    dict
}

/// Lowercase strings a filter term is matched against
///
/// Scalars and objects give one string; arrays give one per element.
pub fn normalize_for_filter(value: &Json) -> Vec<String> {
    fn scalar(value: &Json) -> String {
        match value {
            Json::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        }
    }
    match value {
        Json::Null => Vec::new(),
        Json::Array(items) => items.iter().map(scalar).collect(),
        other => vec![scalar(other)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dates_become_strings() {
        let date = string_to_date("2023-06-01T08:30:00Z").unwrap();
        let mut dict = Dictionary::new();
        dict.insert("_metadata_date".to_string(), Value::Date(date));
        dict.insert("size".to_string(), Value::from(12i64));

        let json = to_json(&Value::Dictionary(dict));
        assert_eq!(json, json!({"_metadata_date": "2023-06-01T08:30:00Z", "size": 12}));
    }

    #[test]
    fn test_strings_become_dates_only_under_date_keys() {
        let json = json!({
            "creation_Date": "2023-06-01T08:30:00Z",
            "notes": "2023-06-01T08:30:00Z",
            "modification_date": "yesterday",
            "force_install_after_date": "2023-06-01T08:30:00",
            "ignored": null,
        });
        let dict = object_to_dict(json.as_object().unwrap());

        assert!(matches!(dict.get("creation_Date"), Some(Value::Date(_))));
        assert!(matches!(dict.get("force_install_after_date"), Some(Value::Date(_))));
        assert_eq!(dict.get("notes"), Some(&Value::from("2023-06-01T08:30:00Z")));
        assert_eq!(dict.get("modification_date"), Some(&Value::from("yesterday")));
        assert!(!dict.contains_key("ignored"));
    }

    #[test]
    fn test_date_round_trip_through_json() {
        let original = string_to_date("1999-12-31T23:59:59Z").unwrap();
        assert_eq!(date_to_string(&original), "1999-12-31T23:59:59Z");
    }

    #[test]
    fn test_numbers_and_nesting() {
        let json = json!({"installs": [{"size": 3, "ratio": 0.5, "gone": null}], "big": u64::MAX});
        let dict = object_to_dict(json.as_object().unwrap());
        let installs = dict.get("installs").and_then(Value::as_array).unwrap();
        let first = installs[0].as_dictionary().unwrap();
        assert_eq!(first.get("size"), Some(&Value::from(3i64)));
        assert_eq!(first.get("ratio"), Some(&Value::Real(0.5)));
        assert!(!first.contains_key("gone"));
        assert_eq!(dict.get("big"), Some(&Value::from(u64::MAX)));
    }

    #[test]
    fn test_data_is_base64() {
        assert_eq!(to_json(&Value::Data(vec![1, 2, 3])), json!("AQID"));
    }

    #[test]
    fn test_normalize_for_filter() {
        assert_eq!(normalize_for_filter(&json!("FireFox")), vec!["firefox"]);
        assert_eq!(normalize_for_filter(&json!(["Testing", 3])), vec!["testing", "3"]);
        assert_eq!(normalize_for_filter(&json!(true)), vec!["true"]);
        assert!(normalize_for_filter(&json!(null)).is_empty());
    }
}

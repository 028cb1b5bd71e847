// src/record.rs

//! Property-list codec and field helpers for structured records
//!
//! Manifests and pkginfo files are dictionaries; catalogs are arrays of
//! pkginfo-like dictionaries. Everything is written back as XML plists.

use plist::{Dictionary, Value};
use std::io::Cursor;

/// Sections every new manifest starts with
pub const MANIFEST_SECTIONS: [&str; 6] = [
    "catalogs",
    "included_manifests",
    "managed_installs",
    "managed_uninstalls",
    "managed_updates",
    "optional_installs",
];

/// Leading bytes of a binary plist
const BINARY_MAGIC: &[u8] = b"bplist00";

/// Parse plist bytes, `None` if they do not parse
///
/// Only XML and binary plists are accepted. Anything that is not binary is
/// read as XML, so stray text never comes back as an OpenStep string.
pub fn parse(bytes: &[u8]) -> Option<Value> {
    let parsed = if bytes.starts_with(BINARY_MAGIC) {
        Value::from_reader(Cursor::new(bytes))
    } else {
        Value::from_reader_xml(Cursor::new(bytes))
    };
    parsed.ok()
}

/// Serialize a value as an XML plist
pub fn to_xml(value: &Value) -> Result<Vec<u8>, plist::Error> {
    let mut buffer = Vec::new();
    value.to_writer_xml(&mut buffer)?;
    Ok(buffer)
}

/// Serialize a dictionary as an XML plist
pub fn dict_to_xml(dict: &Dictionary) -> Result<Vec<u8>, plist::Error> {
    to_xml(&Value::Dictionary(dict.clone()))
}

/// Empty manifest with all six list sections
pub fn manifest_defaults() -> Dictionary {
    MANIFEST_SECTIONS
        .iter()
        .map(|section| (section.to_string(), Value::Array(Vec::new())))
        .collect()
}

/// Placeholder pkginfo for a brand-new record
pub fn pkginfo_defaults() -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert("name".to_string(), Value::from("ProductName"));
    dict.insert("display_name".to_string(), Value::from("Display Name"));
    dict.insert("description".to_string(), Value::from("Product description"));
    dict.insert("version".to_string(), Value::from("1.0"));
    dict.insert(
        "catalogs".to_string(),
        Value::Array(vec![Value::from("development")]),
    );
    dict
}

/// Fill display fields a pkginfo editor expects, leaving present keys alone
pub fn inject_edit_defaults(dict: &mut Dictionary) {
    for key in ["display_name", "description", "category", "developer"] {
        if !dict.contains_key(key) {
            dict.insert(key.to_string(), Value::from(""));
        }
    }
    for key in ["unattended_install", "unattended_uninstall"] {
        if !dict.contains_key(key) {
            dict.insert(key.to_string(), Value::Boolean(false));
        }
    }
}

/// String value of `key`, if present and a string
pub fn get_str<'a>(dict: &'a Dictionary, key: &str) -> Option<&'a str> {
    dict.get(key).and_then(Value::as_string)
}

/// Installer payload path of a pkginfo, relative to `pkgs`
pub fn installer_item_location(dict: &Dictionary) -> Option<&str> {
    get_str(dict, "installer_item_location").filter(|location| !location.is_empty())
}

/// String elements of an array value; non-strings are ignored
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_string)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Truthiness of a plist value: missing, empty and zero values are false
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None => false,
        Some(Value::Boolean(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Dictionary(dict)) => !dict.is_empty(),
        Some(Value::Data(bytes)) => !bytes.is_empty(),
        Some(Value::Integer(i)) => i.as_signed() != Some(0) && i.as_unsigned() != Some(0),
        Some(Value::Real(r)) => *r != 0.0,
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_defaults() {
        let manifest = manifest_defaults();
        assert_eq!(manifest.len(), 6);
        for section in MANIFEST_SECTIONS {
            assert_eq!(manifest.get(section), Some(&Value::Array(Vec::new())));
        }
    }

    #[test]
    fn test_xml_round_trip() {
        let mut dict = pkginfo_defaults();
        dict.insert("installer_item_size".to_string(), Value::from(1024i64));
        dict.insert("uninstallable".to_string(), Value::Boolean(true));

        let bytes = dict_to_xml(&dict).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("<key>name</key>"));

        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.as_dictionary(), Some(&dict));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse(b"this is not a plist").is_none());
        assert!(parse(b"").is_none());
        assert!(parse(b"<?xml version=\"1.0\"?><plist><dict><key>a</key>").is_none());
    }

    #[test]
    fn test_parse_rejects_plain_text() {
        assert!(parse(b"<plist>oops").is_none());
        assert!(parse(b"Firefox").is_none());
        assert!(parse(b"{ name = Firefox; }").is_none());
        assert!(parse(b"(testing, production)").is_none());
    }

    #[test]
    fn test_parse_binary_plist() {
        let mut dict = Dictionary::new();
        dict.insert("name".to_string(), Value::from("Firefox"));
        let value = Value::Dictionary(dict);
        let mut bytes = Vec::new();
        value.to_writer_binary(&mut bytes).unwrap();

        assert!(bytes.starts_with(BINARY_MAGIC));
        assert_eq!(parse(&bytes), Some(value));
    }

    #[test]
    fn test_inject_edit_defaults_keeps_existing() {
        let mut dict = Dictionary::new();
        dict.insert("category".to_string(), Value::from("Utilities"));
        inject_edit_defaults(&mut dict);

        assert_eq!(get_str(&dict, "category"), Some("Utilities"));
        assert_eq!(get_str(&dict, "display_name"), Some(""));
        assert_eq!(dict.get("unattended_install"), Some(&Value::Boolean(false)));
    }

    #[test]
    fn test_string_list_and_truthiness() {
        let value = Value::Array(vec![Value::from("testing"), Value::from(3i64)]);
        assert_eq!(string_list(Some(&value)), vec!["testing".to_string()]);
        assert!(string_list(None).is_empty());

        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&Value::Array(Vec::new()))));
        assert!(is_truthy(Some(&value)));
        assert!(!is_truthy(Some(&Value::from(""))));
        assert!(is_truthy(Some(&Value::from("Firefox"))));
    }
}

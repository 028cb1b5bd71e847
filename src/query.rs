// src/query.rs

//! Filtered listings of structured records
//!
//! A query lists every record of a kind, keeps those whose fields match
//! all `key=value` terms, and optionally projects each result down to a
//! set of fields. Matching is a case-insensitive substring test against
//! the field's value (or any element of it, for lists). Every result
//! carries its `filename`.

use crate::convert::{normalize_for_filter, to_json};
use crate::error::{Error, Result};
use crate::kind::RecordKind;
use crate::store::PlistStore;
use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

/// Field holding a record's path in query results
pub const FILENAME_FIELD: &str = "filename";

/// Query term selecting the projected fields
pub const FIELDS_TERM: &str = "api_fields";

/// A record query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    filters: Vec<(String, String)>,
    fields: Option<Vec<String>>,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to contain `value`
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Keep only these fields in each result
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Build a query from `key=value` terms
    ///
    /// `api_fields=a,b` selects fields; a bare `_` term is ignored.
    pub fn from_terms<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let mut query = Self::new();
        for term in terms {
            let term = term.as_ref();
            if term == "_" || term.starts_with("_=") {
                continue;
            }
            let Some((key, value)) = term.split_once('=') else {
                return Err(Error::InvalidQuery(format!(
                    "{:?} is not a key=value term",
                    term
                )));
            };
            if key == FIELDS_TERM {
                query = query.fields(value.split(',').filter(|f| !f.is_empty()));
            } else {
                query = query.filter(key, value);
            }
        }
        Ok(query)
    }

    /// True when results can be produced from paths alone
    pub fn filename_only(&self) -> bool {
        matches!(self.fields.as_deref(), Some([only]) if only == FILENAME_FIELD)
            && self.filters.iter().all(|(key, _)| key == FILENAME_FIELD)
            && self.filters.len() <= 1
    }

    /// True when `record` satisfies every filter
    pub fn matches(&self, record: &Map<String, Json>) -> bool {
        self.filters.iter().all(|(key, wanted)| {
            let wanted = wanted.to_lowercase();
            record
                .get(key)
                .map(|value| {
                    normalize_for_filter(value)
                        .iter()
                        .any(|candidate| candidate.contains(&wanted))
                })
                .unwrap_or(false)
        })
    }

    fn project(&self, record: Map<String, Json>) -> Map<String, Json> {
        match &self.fields {
            Some(fields) => record
                .into_iter()
                .filter(|(key, _)| key == FILENAME_FIELD || fields.contains(key))
                .collect(),
            None => record,
        }
    }

    /// Run the query over every record of `kind`
    pub fn run(&self, store: &PlistStore<'_>, kind: RecordKind) -> Result<Vec<Map<String, Json>>> {
        let paths = store.list(kind)?;

        if self.filename_only() {
            debug!("Filename-only query over {} {}", paths.len(), kind);
            let wanted = self.filters.first().map(|(_, value)| value.to_lowercase());
            return Ok(paths
                .into_iter()
                .filter(|path| {
                    wanted
                        .as_ref()
                        .map(|w| path.to_lowercase().contains(w))
                        .unwrap_or(true)
                })
                .map(|path| {
                    let mut record = Map::new();
                    record.insert(FILENAME_FIELD.to_string(), Json::String(path));
                    record
                })
                .collect());
        }

        Ok(self.collect(store, kind, paths))
    }

    /// Read, filter and project the records at `paths`
    fn collect(
        &self,
        store: &PlistStore<'_>,
        kind: RecordKind,
        paths: Vec<String>,
    ) -> Vec<Map<String, Json>> {
        let mut results = Vec::new();
        for path in paths {
            // A record removed or unreadable since listing is left out
            let value = match store.read(kind, &path) {
                Ok(value) => to_json(&value),
                Err(e) => {
                    warn!("Skipping {} {} in query: {}", kind, path, e);
                    continue;
                }
            };
            let mut record = match (kind, value) {
                (RecordKind::Catalogs, contents) => {
                    let mut wrapped = Map::new();
                    wrapped.insert("contents".to_string(), contents);
                    wrapped
                }
                (_, Json::Object(map)) => map,
                (_, _) => Map::new(),
            };
            record.insert(FILENAME_FIELD.to_string(), Json::String(path));

            if self.matches(&record) {
                results.push(self.project(record));
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepoConfig;
    use crate::repo::Repository;
    use serde_json::json;
    use tempfile::TempDir;

    fn object(value: Json) -> Map<String, Json> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_terms() {
        let query =
            RecordQuery::from_terms(&["name=Firefox", "api_fields=name,version", "_=123"]).unwrap();
        assert_eq!(
            query,
            RecordQuery::new()
                .filter("name", "Firefox")
                .fields(["name", "version"])
        );
        assert!(RecordQuery::from_terms(&["novalue"]).is_err());
    }

    #[test]
    fn test_filename_only_detection() {
        assert!(RecordQuery::new().fields(["filename"]).filename_only());
        assert!(
            RecordQuery::new()
                .fields(["filename"])
                .filter("filename", "site")
                .filename_only()
        );
        assert!(
            !RecordQuery::new()
                .fields(["filename"])
                .filter("name", "x")
                .filename_only()
        );
        assert!(!RecordQuery::new().fields(["filename", "name"]).filename_only());
        assert!(!RecordQuery::new().filename_only());
    }

    #[test]
    fn test_matches_case_insensitive_substring() {
        let record = object(json!({"name": "Firefox", "catalogs": ["Testing", "production"]}));
        assert!(RecordQuery::new().filter("name", "fox").matches(&record));
        assert!(RecordQuery::new().filter("catalogs", "TEST").matches(&record));
        assert!(!RecordQuery::new().filter("catalogs", "dev").matches(&record));
        assert!(!RecordQuery::new().filter("developer", "").matches(&record));
    }

    #[test]
    fn test_projection() {
        let query = RecordQuery::new().fields(["name", "filename"]);
        let record = object(json!({"name": "Foo", "version": "1.0", "filename": "Foo.plist"}));
        let projected = query.project(record);
        assert_eq!(Json::Object(projected), json!({"name": "Foo", "filename": "Foo.plist"}));
    }

    #[test]
    fn test_vanished_record_is_skipped() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::open(RepoConfig::new(temp.path())).unwrap();
        let store = repo.plists();
        store
            .create(RecordKind::Manifests, "site_default", None, None)
            .unwrap();
        store
            .create(RecordKind::Manifests, "lab", None, None)
            .unwrap();
        let paths = store.list(RecordKind::Manifests).unwrap();
        store.delete(RecordKind::Manifests, "lab", None).unwrap();

        let results = RecordQuery::new()
            .fields(["catalogs"])
            .collect(&store, RecordKind::Manifests, paths);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0][FILENAME_FIELD], json!("site_default"));

        let rerun = RecordQuery::new().run(&store, RecordKind::Manifests).unwrap();
        assert_eq!(rerun.len(), 1);
    }
}

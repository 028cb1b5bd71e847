// src/manifest.rs

//! Manifest store
//!
//! A thin layer over [`PlistStore`] for the `manifests` kind. Its text
//! `read` differs from the generic tolerant read: when a manifest does not
//! parse (or parses to nothing) the raw file text is returned so an editor
//! can show and fix it. [`ManifestStore::read_as_plist`] keeps the
//! generic empty-dictionary policy.

use crate::audit::Actor;
use crate::catalog::CatalogFacets;
use crate::error::{Error, Result};
use crate::kind::RecordKind;
use crate::record;
use crate::repo::{ALL_CATALOG, RepoLayout, Repository};
use crate::store::{PlistStore, RecordReader};
use plist::{Dictionary, Value};

const KIND: RecordKind = RecordKind::Manifests;

/// CRUD for manifests
#[derive(Debug, Clone, Copy)]
pub struct ManifestStore<'a> {
    repo: &'a Repository,
    plists: PlistStore<'a>,
}

impl<'a> ManifestStore<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            repo,
            plists: PlistStore::new(repo),
        }
    }

    /// Every manifest path, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        self.plists.list(KIND)
    }

    /// Create a manifest; all six sections start empty when `data` is `None`
    ///
    /// Returns the XML that was written.
    pub fn create(
        &self,
        relative: &str,
        data: Option<Dictionary>,
        actor: Option<&Actor>,
    ) -> Result<String> {
        let data = data
            .filter(|dict| !dict.is_empty())
            .unwrap_or_else(record::manifest_defaults);
        let bytes = self
            .plists
            .create(KIND, relative, Some(Value::Dictionary(data)), actor)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parsed manifest; unparsable or non-dictionary files read as empty
    pub fn read_as_plist(&self, relative: &str) -> Result<Dictionary> {
        self.plists.read_dict(KIND, relative)
    }

    /// Manifest as XML text, or the raw file text when it does not parse
    pub fn read(&self, relative: &str) -> Result<String> {
        let bytes = self.plists.read_raw(KIND, relative)?;
        match record::parse(&bytes) {
            Some(value) if record::is_truthy(Some(&value)) => {
                let xml = record::to_xml(&value).map_err(|source| Error::Encode {
                    path: RepoLayout::label(KIND, relative),
                    source,
                })?;
                Ok(String::from_utf8_lossy(&xml).into_owned())
            }
            _ => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    /// Overwrite a manifest with text as given
    pub fn write(&self, relative: &str, data: &str, actor: Option<&Actor>) -> Result<()> {
        self.plists.write(KIND, relative, data.as_bytes(), actor)
    }

    /// Serialize and overwrite a manifest
    pub fn write_record(
        &self,
        relative: &str,
        manifest: &Dictionary,
        actor: Option<&Actor>,
    ) -> Result<()> {
        self.plists
            .write_record(KIND, relative, &Value::Dictionary(manifest.clone()), actor)
    }

    pub fn delete(&self, relative: &str, actor: Option<&Actor>) -> Result<()> {
        self.plists.delete(KIND, relative, actor)
    }

    /// Install-item names valid for a manifest
    ///
    /// Unions the facets of the catalogs the manifest lists, or of `all`
    /// when it lists none. An unparsable manifest yields empty facets.
    pub fn install_item_names(&self, relative: &str) -> Result<CatalogFacets> {
        let Some(manifest) = self
            .plists
            .read_record(KIND, relative)?
            .and_then(Value::into_dictionary)
        else {
            return Ok(CatalogFacets::default());
        };

        let catalogs = match manifest.get("catalogs") {
            Some(value) => record::string_list(Some(value)),
            None => vec![ALL_CATALOG.to_string()],
        };
        Ok(self.repo.catalogs().facets_for(catalogs.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepoConfig;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> Repository {
        Repository::open(RepoConfig::new(temp.path())).unwrap()
    }

    #[test]
    fn test_create_default_sections() {
        let temp = TempDir::new().unwrap();
        let repo = open(&temp);
        let manifests = repo.manifests();

        let xml = manifests.create("site_default", None, None).unwrap();
        assert!(xml.contains("<key>managed_installs</key>"));
        assert_eq!(
            manifests.read_as_plist("site_default").unwrap(),
            record::manifest_defaults()
        );

        let err = manifests.create("site_default", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_read_returns_raw_text_when_unparsable() {
        let temp = TempDir::new().unwrap();
        let repo = open(&temp);
        let manifests = repo.manifests();

        manifests.write("broken", "<plist>oops", None).unwrap();
        assert_eq!(manifests.read("broken").unwrap(), "<plist>oops");
        assert!(manifests.read_as_plist("broken").unwrap().is_empty());
    }

    #[test]
    fn test_read_reserializes_valid_manifest() {
        let temp = TempDir::new().unwrap();
        let repo = open(&temp);
        let manifests = repo.manifests();

        let mut manifest = record::manifest_defaults();
        manifest.insert(
            "managed_installs".to_string(),
            Value::Array(vec![Value::from("Firefox")]),
        );
        manifests.write_record("lab/mac01", &manifest, None).unwrap();

        let text = manifests.read("lab/mac01").unwrap();
        assert!(text.contains("<string>Firefox</string>"));
        assert_eq!(manifests.list().unwrap(), vec!["lab/mac01"]);
    }

    #[test]
    fn test_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let repo = open(&temp);
        let err = repo.manifests().read("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);
        let err = repo.manifests().delete("nope", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);
    }
}

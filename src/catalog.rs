// src/catalog.rs

//! Read-only indexes over the catalog files
//!
//! Catalogs are produced by an external rebuild tool. Nothing here writes
//! them; every query degrades to "no data" when a catalog is missing or
//! corrupt.

use crate::kind::RecordKind;
use crate::record;
use crate::repo::{ALL_CATALOG, RepoLayout, Repository};
use crate::version::trim_version_string;
use plist::Value;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use tracing::{debug, warn};

/// Install-item name sets for one catalog (or a union of catalogs)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogFacets {
    /// Names of standalone items (no `update_for`)
    pub suggested: BTreeSet<String>,
    /// Names of items that update another item
    pub updates: BTreeSet<String>,
    /// `name-trimmed_version` for every item
    pub with_version: BTreeSet<String>,
}

impl CatalogFacets {
    /// Fold the items of one catalog into these facets
    pub fn absorb(&mut self, items: &[Value]) {
        for item in items.iter().filter_map(Value::as_dictionary) {
            let Some(name) = record::get_str(item, "name") else {
                continue;
            };
            if record::is_truthy(item.get("update_for")) {
                self.updates.insert(name.to_string());
            } else {
                self.suggested.insert(name.to_string());
            }
            if let Some(version) = record::get_str(item, "version") {
                self.with_version
                    .insert(format!("{}-{}", name, trim_version_string(version)));
            }
        }
    }
}

/// Facets of every valid catalog plus global category/developer sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogInfo {
    pub catalogs: BTreeMap<String, CatalogFacets>,
    pub categories: BTreeSet<String>,
    pub developers: BTreeSet<String>,
}

/// Catalog queries against one repository
#[derive(Debug, Clone, Copy)]
pub struct CatalogIndex<'a> {
    repo: &'a Repository,
}

impl<'a> CatalogIndex<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Names of every parsable catalog except `all`
    pub fn list_catalog_names(&self) -> BTreeSet<String> {
        self.catalogs().into_keys().collect()
    }

    /// Parsed contents of every catalog except `all`
    fn catalogs(&self) -> BTreeMap<String, Vec<Value>> {
        let dir = self.repo.layout().kind_dir(RecordKind::Catalogs);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {}: {}", dir.display(), e);
                return BTreeMap::new();
            }
        };

        let mut catalogs = BTreeMap::new();
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || name == ALL_CATALOG {
                continue;
            }
            if !entry.path().is_file() {
                continue;
            }
            if let Some(items) = self.detail(&name) {
                catalogs.insert(name, items);
            }
        }
        catalogs
    }

    /// Items of catalog `name`, or `None` when missing or unparsable
    pub fn detail(&self, name: &str) -> Option<Vec<Value>> {
        let path = self.repo.layout().resolve(RecordKind::Catalogs, name).ok()?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Catalog {} unavailable: {}", name, e);
                return None;
            }
        };
        match record::parse(&bytes) {
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                warn!("{} is not a list", RepoLayout::label(RecordKind::Catalogs, name));
                None
            }
            None => {
                warn!("Could not parse {}", RepoLayout::label(RecordKind::Catalogs, name));
                None
            }
        }
    }

    /// Items of the `all` catalog, if available
    pub fn all_items(&self) -> Option<Vec<Value>> {
        self.detail(ALL_CATALOG)
    }

    /// Facets used for autocomplete and manifest validation
    ///
    /// Empty catalogs get no entry; category and developer sets span every
    /// catalog.
    pub fn catalog_info(&self) -> CatalogInfo {
        let mut info = CatalogInfo::default();
        for (name, items) in self.catalogs() {
            if items.is_empty() {
                continue;
            }
            let mut facets = CatalogFacets::default();
            facets.absorb(&items);
            info.catalogs.insert(name, facets);

            for item in items.iter().filter_map(Value::as_dictionary) {
                if let Some(category) = record::get_str(item, "category").filter(|c| !c.is_empty()) {
                    info.categories.insert(category.to_string());
                }
                if let Some(developer) = record::get_str(item, "developer").filter(|d| !d.is_empty())
                {
                    info.developers.insert(developer.to_string());
                }
            }
        }
        info
    }

    /// Union of facets across `names`; unavailable catalogs contribute nothing
    pub fn facets_for<S: AsRef<str>>(&self, names: &[S]) -> CatalogFacets {
        let mut facets = CatalogFacets::default();
        for name in names {
            if let Some(items) = self.detail(name.as_ref()) {
                facets.absorb(&items);
            }
        }
        facets
    }

    /// Number of `all` items whose `installer_item_location` is `pkg_path`
    pub fn pkg_reference_count(&self, pkg_path: &str) -> usize {
        self.all_items()
            .map(|items| reference_counts(&items).get(pkg_path).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

/// Count items per `installer_item_location`
pub fn reference_counts(items: &[Value]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for location in items
        .iter()
        .filter_map(Value::as_dictionary)
        .filter_map(record::installer_item_location)
    {
        *counts.entry(location.to_string()).or_insert(0) += 1;
    }
    counts
}

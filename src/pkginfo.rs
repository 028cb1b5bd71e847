// src/pkginfo.rs

//! Package-info aggregation and bulk edits
//!
//! [`PkginfoIndex::aggregate`] groups every pkginfo record by item name,
//! newest version first. When the `all` catalog is current it is used as a
//! cache and no individual pkginfo file is opened:
//!
//! - its item count must equal the number of pkginfo files
//! - no pkginfo file may be newer than the catalog file
//!
//! Otherwise every file is read, in parallel on a small rayon pool.
//! Corrupt files are skipped. Aggregation never fails.

use crate::audit::Actor;
use crate::bulk::{BulkReport, ItemOutcome};
use crate::catalog::reference_counts;
use crate::error::{BulkFamily, Result};
use crate::kind::RecordKind;
use crate::record;
use crate::repo::Repository;
use crate::status::PKGSINFO_STATUS_TAG;
use crate::store::RecordReader;
use crate::version;
use plist::{Dictionary, Value};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, warn};

const NO_NAME: &str = "NO_NAME";
const NO_VERSION: &str = "NO_VERSION";

/// One pkginfo record of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageVersion {
    pub version: String,
    pub catalogs: Vec<String>,
    /// Path relative to the pkgsinfo directory
    pub path: String,
}

/// All pkginfo records sharing a name, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageGroup {
    pub name: String,
    pub versions: Vec<PackageVersion>,
}

/// Which source an aggregate was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateSource {
    AllCatalog,
    PkginfoFiles,
}

fn entry_from(item: &Dictionary, path: &str) -> (String, PackageVersion) {
    let name = record::get_str(item, "name").unwrap_or(NO_NAME).to_string();
    let version = PackageVersion {
        version: record::get_str(item, "version")
            .unwrap_or(NO_VERSION)
            .to_string(),
        catalogs: record::string_list(item.get("catalogs")),
        path: path.to_string(),
    };
    (name, version)
}

fn group(entries: impl IntoIterator<Item = (String, PackageVersion)>) -> Vec<PackageGroup> {
    let mut by_name: BTreeMap<String, Vec<PackageVersion>> = BTreeMap::new();
    for (name, version) in entries {
        by_name.entry(name).or_default().push(version);
    }
    by_name
        .into_iter()
        .map(|(name, mut versions)| {
            // stable: equal versions keep discovery order
            versions.sort_by(|a, b| version::compare(&b.version, &a.version));
            PackageGroup { name, versions }
        })
        .collect()
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Split add/remove lists so no name appears in both; order kept, dups dropped
pub fn normalize_catalog_edits<S: AsRef<str>>(add: &[S], remove: &[S]) -> (Vec<String>, Vec<String>) {
    let add_names: Vec<&str> = add.iter().map(AsRef::as_ref).collect();
    let remove_names: Vec<&str> = remove.iter().map(AsRef::as_ref).collect();

    let mut to_add: Vec<String> = Vec::new();
    for name in &add_names {
        if !remove_names.contains(name) && !to_add.iter().any(|n| n == name) {
            to_add.push(name.to_string());
        }
    }
    let mut to_remove: Vec<String> = Vec::new();
    for name in &remove_names {
        if !add_names.contains(name) && !to_remove.iter().any(|n| n == name) {
            to_remove.push(name.to_string());
        }
    }
    (to_add, to_remove)
}

/// Aggregation and bulk operations over pkgsinfo
#[derive(Clone, Copy)]
pub struct PkginfoIndex<'a> {
    repo: &'a Repository,
    reader: Option<&'a dyn RecordReader>,
}

impl<'a> PkginfoIndex<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo, reader: None }
    }

    /// Read individual records through `reader` instead of the plist store
    pub fn with_reader(mut self, reader: &'a dyn RecordReader) -> Self {
        self.reader = Some(reader);
        self
    }

    fn read(&self, path: &str) -> Result<Option<Value>> {
        match self.reader {
            Some(reader) => reader.read_record(RecordKind::Pkgsinfo, path),
            None => self.repo.plists().read_record(RecordKind::Pkgsinfo, path),
        }
    }

    /// Group every pkginfo record by name, versions descending
    pub fn aggregate(&self) -> Vec<PackageGroup> {
        self.aggregate_with_source().1
    }

    /// Like [`aggregate`](Self::aggregate), also reporting the source used
    pub fn aggregate_with_source(&self) -> (AggregateSource, Vec<PackageGroup>) {
        let status = self.repo.status();
        status.message(PKGSINFO_STATUS_TAG, "Starting scan of pkgsinfo data");
        let files = self.repo.plists().list(RecordKind::Pkgsinfo).unwrap_or_default();
        status.message(PKGSINFO_STATUS_TAG, &format!("Processing {} files", files.len()));

        let cached = self.current_all_items(&files);
        status.message(PKGSINFO_STATUS_TAG, "Assembling pkgsinfo data");

        let (source, groups) = match cached {
            Some(items) => {
                debug!("Using the all catalog");
                // The all catalog lists pkginfo in the same sorted order as the files
                let entries = items.iter().zip(&files).map(|(item, path)| {
                    let empty = Dictionary::new();
                    entry_from(item.as_dictionary().unwrap_or(&empty), path)
                });
                (AggregateSource::AllCatalog, group(entries))
            }
            None => {
                debug!("Reading {} pkginfo files individually", files.len());
                let entries = self.read_all(&files);
                (AggregateSource::PkginfoFiles, group(entries.into_iter().flatten()))
            }
        };

        status.message(PKGSINFO_STATUS_TAG, "Completed assembly of pkgsinfo data");
        (source, groups)
    }

    /// Items of the `all` catalog when it can stand in for `files`
    fn current_all_items(&self, files: &[String]) -> Option<Vec<Value>> {
        let items = self.repo.catalogs().all_items().unwrap_or_default();
        if items.len() != files.len() {
            debug!(
                "all catalog has {} items for {} pkginfo files",
                items.len(),
                files.len()
            );
            return None;
        }

        let Some(catalog_mtime) = modified(&self.repo.layout().all_catalog()) else {
            debug!("all catalog has no modification time");
            return None;
        };
        let pkgsinfo_dir = self.repo.layout().kind_dir(RecordKind::Pkgsinfo);
        let stale = files.iter().any(|file| match modified(&pkgsinfo_dir.join(file)) {
            Some(mtime) => mtime > catalog_mtime,
            None => true,
        });
        if stale {
            debug!("pkginfo files are newer than the all catalog");
            return None;
        }
        Some(items)
    }

    fn read_one(&self, path: &str) -> Option<(String, PackageVersion)> {
        match self.read(path) {
            Ok(Some(Value::Dictionary(item))) => Some(entry_from(&item, path)),
            Ok(Some(_)) => {
                warn!("Skipping pkgsinfo/{}: not a dictionary", path);
                None
            }
            Ok(None) => {
                warn!("Skipping pkgsinfo/{}: could not parse", path);
                None
            }
            Err(e) => {
                warn!("Skipping pkgsinfo/{}: {}", path, e);
                None
            }
        }
    }

    fn read_all(&self, files: &[String]) -> Vec<Option<(String, PackageVersion)>> {
        let workers = self.repo.config().read_workers.max(1);
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| files.par_iter().map(|path| self.read_one(path)).collect()),
            Err(e) => {
                warn!("Could not start read pool ({}); reading sequentially", e);
                files.iter().map(|path| self.read_one(path)).collect()
            }
        }
    }

    /// References to the installer item of `pkginfo_path`
    ///
    /// Returns the count of `catalog_items` sharing its
    /// `installer_item_location`, and that location. `(0, None)` when the
    /// record is unreadable or has no installer item.
    pub fn pkg_ref_count(
        &self,
        pkginfo_path: &str,
        counts: &HashMap<String, usize>,
    ) -> (usize, Option<String>) {
        let location = match self.read(pkginfo_path) {
            Ok(Some(Value::Dictionary(item))) => {
                record::installer_item_location(&item).map(str::to_string)
            }
            _ => None,
        };
        match location {
            Some(location) => (counts.get(&location).copied().unwrap_or(0), Some(location)),
            None => (0, None),
        }
    }

    /// Delete pkginfo records, optionally with installer items they alone use
    pub fn mass_delete<S: AsRef<str>>(
        &self,
        paths: &[S],
        actor: Option<&Actor>,
        delete_pkgs: bool,
    ) -> Result<()> {
        self.mass_delete_report(paths, actor, delete_pkgs)
            .into_result(BulkFamily::Delete)
    }

    /// [`mass_delete`](Self::mass_delete) with per-item outcomes
    pub fn mass_delete_report<S: AsRef<str>>(
        &self,
        paths: &[S],
        actor: Option<&Actor>,
        delete_pkgs: bool,
    ) -> BulkReport {
        // One snapshot for the whole call
        let counts = if delete_pkgs {
            self.repo
                .catalogs()
                .all_items()
                .map(|items| reference_counts(&items))
                .unwrap_or_default()
        } else {
            HashMap::new()
        };

        let plists = self.repo.plists();
        let files = self.repo.files();
        let mut report = BulkReport::new();
        for path in paths {
            let path = path.as_ref();
            let pkg_to_delete = if delete_pkgs {
                match self.pkg_ref_count(path, &counts) {
                    (1, Some(location)) => Some(location),
                    _ => None,
                }
            } else {
                None
            };

            if let Err(e) = plists.delete(RecordKind::Pkgsinfo, path, actor) {
                report.push(
                    path,
                    ItemOutcome::Failed(vec![format!("Error {} when removing {}", e, path)]),
                );
                continue;
            }

            let outcome = match pkg_to_delete {
                Some(location) => match files.delete(RecordKind::Pkgs, &location, actor) {
                    Ok(()) => ItemOutcome::Done,
                    Err(e) => {
                        ItemOutcome::Failed(vec![format!("Error {} when removing {}", e, location)])
                    }
                },
                None => ItemOutcome::Done,
            };
            report.push(path, outcome);
        }
        report
    }

    /// Add and remove catalogs on many pkginfo records
    pub fn mass_edit_catalogs<S: AsRef<str>>(
        &self,
        paths: &[S],
        add: &[S],
        remove: &[S],
        actor: Option<&Actor>,
    ) -> Result<()> {
        self.mass_edit_catalogs_report(paths, add, remove, actor)
            .into_result(BulkFamily::Write)
    }

    /// [`mass_edit_catalogs`](Self::mass_edit_catalogs) with per-item outcomes
    ///
    /// Records whose catalogs would not change are not written.
    pub fn mass_edit_catalogs_report<S: AsRef<str>>(
        &self,
        paths: &[S],
        add: &[S],
        remove: &[S],
        actor: Option<&Actor>,
    ) -> BulkReport {
        let (to_add, to_remove) = normalize_catalog_edits(add, remove);
        let plists = self.repo.plists();
        let mut report = BulkReport::new();

        for path in paths {
            let path = path.as_ref();
            // An unparsable record is unreadable here; rewriting it would lose its content
            let mut item = match self.read(path) {
                Ok(Some(Value::Dictionary(item))) => item,
                _ => {
                    report.push(path, ItemOutcome::Failed(vec![format!("Could not read {}", path)]));
                    continue;
                }
            };

            let mut catalogs = item
                .get("catalogs")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let has = |catalogs: &[Value], name: &str| {
                catalogs.iter().any(|c| c.as_string() == Some(name))
            };
            let additions: Vec<&String> = to_add.iter().filter(|n| !has(&catalogs, n)).collect();
            let removals = to_remove.iter().any(|n| has(&catalogs, n));
            if additions.is_empty() && !removals {
                report.push(path, ItemOutcome::Unchanged);
                continue;
            }

            catalogs.extend(additions.into_iter().map(|n| Value::from(n.as_str())));
            catalogs.retain(|c| {
                c.as_string()
                    .map(|name| !to_remove.iter().any(|r| r == name))
                    .unwrap_or(true)
            });
            item.insert("catalogs".to_string(), Value::Array(catalogs));

            let outcome = match plists.write_record(
                RecordKind::Pkgsinfo,
                path,
                &Value::Dictionary(item),
                actor,
            ) {
                Ok(()) => ItemOutcome::Done,
                Err(e) => ItemOutcome::Failed(vec![format!("Error {} when updating {}", e, path)]),
            };
            report.push(path, outcome);
        }
        report
    }
}

impl std::fmt::Debug for PkginfoIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkginfoIndex")
            .field("repo", &self.repo)
            .field("custom_reader", &self.reader.is_some())
            .finish()
    }
}

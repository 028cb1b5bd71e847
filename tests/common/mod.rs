// tests/common/mod.rs

//! Shared test utilities for integration tests: throwaway repositories.

#![allow(dead_code)]

use filetime::FileTime;
use munkiadmin::record;
use munkiadmin::{ChangeAuditor, ChangeKind, RecordKind, RepoConfig, Repository};
use munkiadmin::{Actor, PlistStore, RecordReader};
use plist::{Dictionary, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// A repository rooted in a temporary directory
///
/// Keep the value alive for the duration of the test.
pub struct TestRepo {
    pub temp: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        for kind in ["manifests", "pkgsinfo", "catalogs", "icons", "pkgs"] {
            fs::create_dir_all(temp.path().join(kind)).unwrap();
        }
        let repo = Repository::open(RepoConfig::new(temp.path())).unwrap();
        Self { temp, repo }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn path(&self, kind: RecordKind, relative: &str) -> PathBuf {
        self.root().join(kind.dir_name()).join(relative)
    }

    /// Write a pkginfo file and return its dictionary
    pub fn write_pkginfo(
        &self,
        relative: &str,
        name: &str,
        version: &str,
        catalogs: &[&str],
        location: Option<&str>,
    ) -> Value {
        let item = pkginfo_item(name, version, catalogs, location);
        write_plist(&self.path(RecordKind::Pkgsinfo, relative), &item);
        item
    }

    pub fn write_catalog(&self, name: &str, items: Vec<Value>) {
        write_plist(&self.path(RecordKind::Catalogs, name), &Value::Array(items));
    }

    pub fn write_pkg(&self, relative: &str) {
        let path = self.path(RecordKind::Pkgs, relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"installer payload").unwrap();
    }

    /// Set the modification time of a repository file (seconds since epoch)
    pub fn set_mtime(&self, kind: RecordKind, relative: &str, seconds: i64) {
        filetime::set_file_mtime(
            self.path(kind, relative),
            FileTime::from_unix_time(seconds, 0),
        )
        .unwrap();
    }

    pub fn read_dict(&self, kind: RecordKind, relative: &str) -> Dictionary {
        let bytes = fs::read(self.path(kind, relative)).unwrap();
        record::parse(&bytes).unwrap().into_dictionary().unwrap()
    }
}

/// Build a pkginfo dictionary
pub fn pkginfo_item(name: &str, version: &str, catalogs: &[&str], location: Option<&str>) -> Value {
    let mut dict = Dictionary::new();
    dict.insert("name".to_string(), Value::from(name));
    dict.insert("version".to_string(), Value::from(version));
    dict.insert(
        "catalogs".to_string(),
        Value::Array(catalogs.iter().map(|c| Value::from(*c)).collect()),
    );
    if let Some(location) = location {
        dict.insert("installer_item_location".to_string(), Value::from(location));
    }
    Value::Dictionary(dict)
}

pub fn write_plist(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, record::to_xml(value).unwrap()).unwrap();
}

/// Reader that counts how many records were read
pub struct CountingReader<'a> {
    inner: PlistStore<'a>,
    reads: AtomicUsize,
}

impl<'a> CountingReader<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            inner: repo.plists(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl RecordReader for CountingReader<'_> {
    fn read_record(&self, kind: RecordKind, path: &str) -> munkiadmin::Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_record(kind, path)
    }
}

/// Auditor that remembers every change it is told about
#[derive(Default)]
pub struct RecordingAuditor {
    pub changes: Mutex<Vec<(PathBuf, String, ChangeKind)>>,
}

impl RecordingAuditor {
    pub fn count(&self) -> usize {
        self.changes.lock().unwrap().len()
    }
}

impl ChangeAuditor for RecordingAuditor {
    fn record_change(&self, path: &Path, actor: &Actor, change: ChangeKind) {
        self.changes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), actor.username.clone(), change));
    }
}

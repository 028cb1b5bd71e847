// src/store.rs

//! Filesystem-backed record stores
//!
//! [`PlistStore`] handles the structured kinds (manifests, pkgsinfo,
//! catalogs) and [`FileStore`] the opaque blob kinds (icons, pkgs). Both
//! borrow a [`Repository`] and share its layout, auditor and status sink.
//!
//! Reads of structured files are tolerant: bytes that do not parse come
//! back as an empty dictionary instead of an error. Filesystem failures
//! are always errors.

use crate::audit::{Actor, ChangeKind};
use crate::error::{Error, Result};
use crate::kind::RecordKind;
use crate::record;
use crate::repo::{RepoLayout, Repository};
use crate::status::{MANIFEST_LIST_STATUS_TAG, PKGSINFO_STATUS_TAG};
use crate::walk;
use plist::{Dictionary, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Source of parsed structured records
///
/// `Ok(None)` means the file exists but did not parse. The aggregator
/// reads through this seam so the read primitive can be instrumented.
pub trait RecordReader: Sync {
    fn read_record(&self, kind: RecordKind, path: &str) -> Result<Option<Value>>;
}

fn status_tag(kind: RecordKind) -> String {
    match kind {
        RecordKind::Manifests => MANIFEST_LIST_STATUS_TAG.to_string(),
        RecordKind::Pkgsinfo => PKGSINFO_STATUS_TAG.to_string(),
        other => other.list_status_tag(),
    }
}

fn list_kind(repo: &Repository, kind: RecordKind) -> Vec<String> {
    let root = repo.layout().kind_dir(kind);
    let tag = status_tag(kind);
    let files = walk::list_files(&root, &tag, repo.status());
    debug!("Listed {} {} record(s)", files.len(), kind);
    files
}

fn actor_label(actor: Option<&Actor>) -> &str {
    actor.map(|a| a.username.as_str()).unwrap_or("anonymous")
}

/// Write `bytes` to `path`, creating parent directories
pub(crate) fn write_file(path: &Path, bytes: &[u8], label: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::Write {
            path: label.to_string(),
            source,
        })?;
    }
    fs::write(path, bytes).map_err(|source| Error::Write {
        path: label.to_string(),
        source,
    })
}

/// Remove the file at `path`; absent files are `DoesNotExist`
pub(crate) fn remove_file(path: &Path, label: &str) -> Result<()> {
    if !path.is_file() {
        return Err(Error::DoesNotExist(label.to_string()));
    }
    fs::remove_file(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => Error::DoesNotExist(label.to_string()),
        _ => Error::Delete {
            path: label.to_string(),
            source,
        },
    })
}

fn read_file(path: &Path, label: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => Error::DoesNotExist(label.to_string()),
        _ => Error::Read {
            path: label.to_string(),
            source,
        },
    })
}

/// Log the outcome of a mutating operation and audit successes
fn finish<T>(
    repo: &Repository,
    result: Result<T>,
    action: &str,
    kind: RecordKind,
    relative: &str,
    audit: Option<(&Path, ChangeKind)>,
    actor: Option<&Actor>,
) -> Result<T> {
    match &result {
        Ok(_) => {
            info!(
                actor = actor_label(actor),
                kind = %kind,
                path = relative,
                "{} {}",
                action,
                RepoLayout::label(kind, relative)
            );
            if let (Some((path, change)), Some(actor), Some(auditor)) =
                (audit, actor, repo.auditor())
            {
                auditor.record_change(path, actor, change);
            }
        }
        Err(e) => {
            error!(
                actor = actor_label(actor),
                kind = %kind,
                path = relative,
                "{} {} failed: {}",
                action,
                RepoLayout::label(kind, relative),
                e
            );
        }
    }
    result
}

/// CRUD for manifests, pkgsinfo and catalogs
#[derive(Debug, Clone, Copy)]
pub struct PlistStore<'a> {
    repo: &'a Repository,
}

impl<'a> PlistStore<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    fn check(kind: RecordKind) -> Result<()> {
        if kind.is_structured() {
            Ok(())
        } else {
            Err(Error::UnsupportedKind {
                kind,
                expected: "structured",
            })
        }
    }

    fn locate(&self, kind: RecordKind, relative: &str) -> Result<(PathBuf, String)> {
        Self::check(kind)?;
        let path = self.repo.layout().resolve(kind, relative)?;
        Ok((path, RepoLayout::label(kind, relative)))
    }

    /// Every record path of `kind`, sorted, hidden entries excluded
    pub fn list(&self, kind: RecordKind) -> Result<Vec<String>> {
        Self::check(kind)?;
        Ok(list_kind(self.repo, kind))
    }

    /// Raw bytes of a record
    pub fn read_raw(&self, kind: RecordKind, relative: &str) -> Result<Vec<u8>> {
        let (path, label) = self.locate(kind, relative)?;
        if !path.is_file() {
            return Err(Error::DoesNotExist(label));
        }
        read_file(&path, &label)
    }

    /// Parsed record; an unparsable file reads as an empty dictionary
    pub fn read(&self, kind: RecordKind, relative: &str) -> Result<Value> {
        match self.read_record(kind, relative)? {
            Some(value) => Ok(value),
            None => {
                warn!("Could not parse {}; treating it as empty", RepoLayout::label(kind, relative));
                Ok(Value::Dictionary(Dictionary::new()))
            }
        }
    }

    /// Parsed dictionary record; anything else reads as empty
    pub fn read_dict(&self, kind: RecordKind, relative: &str) -> Result<Dictionary> {
        Ok(self
            .read(kind, relative)?
            .into_dictionary()
            .unwrap_or_default())
    }

    /// Pkginfo with the display fields an editor expects filled in
    pub fn read_pkginfo_for_edit(&self, relative: &str) -> Result<Dictionary> {
        let mut dict = self.read_dict(RecordKind::Pkgsinfo, relative)?;
        record::inject_edit_defaults(&mut dict);
        Ok(dict)
    }

    /// Create a record, seeding kind defaults when `data` is `None`
    ///
    /// Returns the serialized bytes that were written.
    pub fn create(
        &self,
        kind: RecordKind,
        relative: &str,
        data: Option<Value>,
        actor: Option<&Actor>,
    ) -> Result<Vec<u8>> {
        let (path, label) = self.locate(kind, relative)?;
        if path.exists() {
            return Err(Error::AlreadyExists(label));
        }

        let value = data.unwrap_or_else(|| match kind {
            RecordKind::Manifests => Value::Dictionary(record::manifest_defaults()),
            RecordKind::Pkgsinfo => Value::Dictionary(record::pkginfo_defaults()),
            _ => Value::Array(Vec::new()),
        });
        let bytes = record::to_xml(&value).map_err(|source| Error::Encode {
            path: label.clone(),
            source,
        })?;

        let result = write_file(&path, &bytes, &label);
        finish(
            self.repo,
            result,
            "Created",
            kind,
            relative,
            Some((path.as_path(), ChangeKind::Written)),
            actor,
        )?;
        Ok(bytes)
    }

    /// Overwrite a record with already-serialized bytes
    pub fn write(
        &self,
        kind: RecordKind,
        relative: &str,
        data: &[u8],
        actor: Option<&Actor>,
    ) -> Result<()> {
        let (path, label) = self.locate(kind, relative)?;
        let result = write_file(&path, data, &label);
        finish(
            self.repo,
            result,
            "Wrote",
            kind,
            relative,
            Some((path.as_path(), ChangeKind::Written)),
            actor,
        )
    }

    /// Serialize `value` as an XML plist and overwrite the record
    pub fn write_record(
        &self,
        kind: RecordKind,
        relative: &str,
        value: &Value,
        actor: Option<&Actor>,
    ) -> Result<()> {
        Self::check(kind)?;
        let bytes = record::to_xml(value).map_err(|source| Error::Encode {
            path: RepoLayout::label(kind, relative),
            source,
        })?;
        self.write(kind, relative, &bytes, actor)
    }

    /// Shallow-merge `partial` over the stored dictionary and write it back
    pub fn patch(
        &self,
        kind: RecordKind,
        relative: &str,
        partial: &Dictionary,
        actor: Option<&Actor>,
    ) -> Result<Dictionary> {
        let mut merged = self.read_dict(kind, relative)?;
        for (key, value) in partial {
            merged.insert(key.clone(), value.clone());
        }
        merged.remove("filename");

        self.write_record(kind, relative, &Value::Dictionary(merged.clone()), actor)?;
        Ok(merged)
    }

    /// Remove a record
    pub fn delete(&self, kind: RecordKind, relative: &str, actor: Option<&Actor>) -> Result<()> {
        let (path, label) = self.locate(kind, relative)?;
        let result = remove_file(&path, &label);
        finish(
            self.repo,
            result,
            "Deleted",
            kind,
            relative,
            Some((path.as_path(), ChangeKind::Removed)),
            actor,
        )
    }
}

impl RecordReader for PlistStore<'_> {
    fn read_record(&self, kind: RecordKind, relative: &str) -> Result<Option<Value>> {
        let bytes = self.read_raw(kind, relative)?;
        Ok(record::parse(&bytes))
    }
}

/// CRUD for icons and installer payloads
#[derive(Debug, Clone, Copy)]
pub struct FileStore<'a> {
    repo: &'a Repository,
}

impl<'a> FileStore<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    fn check(kind: RecordKind) -> Result<()> {
        if kind.is_structured() {
            Err(Error::UnsupportedKind {
                kind,
                expected: "binary",
            })
        } else {
            Ok(())
        }
    }

    /// Absolute path of a blob
    pub fn full_path(&self, kind: RecordKind, relative: &str) -> Result<PathBuf> {
        Self::check(kind)?;
        self.repo.layout().resolve(kind, relative)
    }

    pub fn list(&self, kind: RecordKind) -> Result<Vec<String>> {
        Self::check(kind)?;
        Ok(list_kind(self.repo, kind))
    }

    pub fn read(&self, kind: RecordKind, relative: &str) -> Result<Vec<u8>> {
        let path = self.full_path(kind, relative)?;
        let label = RepoLayout::label(kind, relative);
        if !path.is_file() {
            return Err(Error::DoesNotExist(label));
        }
        read_file(&path, &label)
    }

    /// Size of a blob in bytes, from its metadata
    pub fn size(&self, kind: RecordKind, relative: &str) -> Result<u64> {
        let path = self.full_path(kind, relative)?;
        let label = RepoLayout::label(kind, relative);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(Error::DoesNotExist(label)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::DoesNotExist(label)),
            Err(source) => Err(Error::Read {
                path: label,
                source,
            }),
        }
    }

    /// Store a new blob; fails if one already exists at `relative`
    pub fn create(
        &self,
        kind: RecordKind,
        relative: &str,
        bytes: &[u8],
        actor: Option<&Actor>,
    ) -> Result<()> {
        let path = self.full_path(kind, relative)?;
        let label = RepoLayout::label(kind, relative);
        if path.exists() {
            return Err(Error::AlreadyExists(label));
        }
        let result = write_file(&path, bytes, &label);
        finish(self.repo, result, "Uploaded", kind, relative, None, actor)
    }

    pub fn write(
        &self,
        kind: RecordKind,
        relative: &str,
        bytes: &[u8],
        actor: Option<&Actor>,
    ) -> Result<()> {
        let path = self.full_path(kind, relative)?;
        let label = RepoLayout::label(kind, relative);
        let result = write_file(&path, bytes, &label);
        finish(self.repo, result, "Wrote", kind, relative, None, actor)
    }

    pub fn delete(&self, kind: RecordKind, relative: &str, actor: Option<&Actor>) -> Result<()> {
        let path = self.full_path(kind, relative)?;
        let label = RepoLayout::label(kind, relative);
        let result = remove_file(&path, &label);
        finish(self.repo, result, "Deleted", kind, relative, None, actor)
    }
}

// src/repo.rs

//! Repository layout and the entry point tying the stores together
//!
//! A repository is a root directory with one subdirectory per
//! [`RecordKind`]. [`Repository`] owns the configuration, the optional
//! change auditor and the status sink, and hands out short-lived store
//! views that borrow it.

use crate::audit::{ChangeAuditor, GitAuditor};
use crate::catalog::CatalogIndex;
use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::kind::RecordKind;
use crate::manifest::ManifestStore;
use crate::pkginfo::PkginfoIndex;
use crate::status::{SilentStatus, StatusSink};
use crate::store::{FileStore, PlistStore};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the catalog holding every pkginfo record
pub const ALL_CATALOG: &str = "all";

/// Maps kinds and relative record paths onto the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding records of `kind`
    pub fn kind_dir(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Path of the aggregate `all` catalog
    pub fn all_catalog(&self) -> PathBuf {
        self.kind_dir(RecordKind::Catalogs).join(ALL_CATALOG)
    }

    /// Normalize a kind-relative path
    ///
    /// `.` components are dropped and `..` pops the previous component.
    /// Paths that are absolute, empty, or climb out of the kind directory
    /// are rejected.
    pub fn normalize(relative: &str) -> Result<PathBuf> {
        let invalid = |reason| Error::InvalidPath {
            path: relative.to_string(),
            reason,
        };

        let mut normalized = PathBuf::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(invalid("escapes the kind directory"));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("must be relative"));
                }
            }
        }
        if normalized.as_os_str().is_empty() {
            return Err(invalid("is empty"));
        }
        Ok(normalized)
    }

    /// Absolute filesystem path for a record
    pub fn resolve(&self, kind: RecordKind, relative: &str) -> Result<PathBuf> {
        Ok(self.kind_dir(kind).join(Self::normalize(relative)?))
    }

    /// `kind/relative` label used in messages and logs
    pub fn label(kind: RecordKind, relative: &str) -> String {
        format!("{}/{}", kind.dir_name(), relative)
    }

    /// Path of `path` relative to the repository root, if inside it
    pub fn repo_relative(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.root)
            .ok()
            .map(crate::walk::to_posix)
    }
}

/// An open repository
pub struct Repository {
    config: RepoConfig,
    layout: RepoLayout,
    auditor: Option<Arc<dyn ChangeAuditor>>,
    status: Arc<dyn StatusSink>,
}

impl Repository {
    /// Open the repository described by `config`
    ///
    /// Auditing is enabled when `git_path` resolves to a binary.
    pub fn open(config: RepoConfig) -> Result<Self> {
        config.validate()?;
        if !config.repo_dir.is_dir() {
            warn!("Repository root {} is not a directory", config.repo_dir.display());
        }

        let layout = RepoLayout::new(&config.repo_dir);
        let auditor = config.resolve_git().map(|git| {
            info!("Auditing changes with {}", git.display());
            let mut auditor = GitAuditor::new(git, layout.root(), &config.app_name);
            if let Some(timeout) = config.git_timeout() {
                auditor = auditor.with_timeout(timeout);
            }
            Arc::new(auditor) as Arc<dyn ChangeAuditor>
        });

        Ok(Self {
            config,
            layout,
            auditor,
            status: Arc::new(SilentStatus),
        })
    }

    /// Replace the status sink
    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    /// Replace (or install) the change auditor
    pub fn with_auditor(mut self, auditor: Arc<dyn ChangeAuditor>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    /// Turn auditing off
    pub fn without_auditor(mut self) -> Self {
        self.auditor = None;
        self
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    pub fn auditor(&self) -> Option<&dyn ChangeAuditor> {
        self.auditor.as_deref()
    }

    pub fn status(&self) -> &dyn StatusSink {
        self.status.as_ref()
    }

    /// Structured records (manifests, pkgsinfo, catalogs)
    pub fn plists(&self) -> PlistStore<'_> {
        PlistStore::new(self)
    }

    /// Binary blobs (icons, pkgs)
    pub fn files(&self) -> FileStore<'_> {
        FileStore::new(self)
    }

    /// Read-only catalog indexes
    pub fn catalogs(&self) -> CatalogIndex<'_> {
        CatalogIndex::new(self)
    }

    /// Manifest-specific store
    pub fn manifests(&self) -> ManifestStore<'_> {
        ManifestStore::new(self)
    }

    /// Pkginfo aggregation and bulk edits
    pub fn pkgsinfo(&self) -> PkginfoIndex<'_> {
        PkginfoIndex::new(self)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.layout.root())
            .field("auditing", &self.auditor.is_some())
            .finish()
    }
}

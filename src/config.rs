// src/config.rs

//! Repository configuration
//!
//! Loaded once at process start and handed to [`crate::Repository`]
//! explicitly; nothing in the crate reads configuration globally.
//!
//! # Example config.toml
//!
//! ```toml
//! repo_dir = "/Users/Shared/munki_repo"
//!
//! # Optional: enables commit auditing of every edit
//! git_path = "/usr/bin/git"
//!
//! app_name = "MunkiWebAdmin"
//! git_timeout_secs = 30
//! read_workers = 4
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Name used in commit messages and synthetic author addresses
pub const DEFAULT_APP_NAME: &str = "MunkiWebAdmin";

/// Worker count for reading individual pkginfo files
pub const DEFAULT_READ_WORKERS: usize = 4;

/// Environment variable overriding `repo_dir`
pub const ENV_REPO_DIR: &str = "MUNKIADMIN_REPO_DIR";

/// Environment variable overriding `git_path`
pub const ENV_GIT_PATH: &str = "MUNKIADMIN_GIT_PATH";

/// Configuration for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Root containing manifests/, pkgsinfo/, catalogs/, icons/, pkgs/
    pub repo_dir: PathBuf,

    /// git binary; auditing is disabled when unset
    #[serde(default)]
    pub git_path: Option<PathBuf>,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Upper bound on a single git invocation
    #[serde(default)]
    pub git_timeout_secs: Option<u64>,

    #[serde(default = "default_read_workers")]
    pub read_workers: usize,
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_read_workers() -> usize {
    DEFAULT_READ_WORKERS
}

impl RepoConfig {
    /// Configuration with defaults for everything but the root
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            git_path: None,
            app_name: default_app_name(),
            git_timeout_secs: None,
            read_workers: DEFAULT_READ_WORKERS,
        }
    }

    /// Enable auditing through the given git binary
    pub fn with_git(mut self, git_path: impl Into<PathBuf>) -> Self {
        self.git_path = Some(git_path.into());
        self
    }

    /// Default config file location (`~/.config/munkiadmin/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("munkiadmin").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: RepoConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MUNKIADMIN_*` overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_REPO_DIR).filter(|v| !v.is_empty()) {
            self.repo_dir = PathBuf::from(dir);
        }
        if let Some(git) = lookup(ENV_GIT_PATH).filter(|v| !v.is_empty()) {
            self.git_path = Some(PathBuf::from(git));
        }
        self
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.repo_dir.as_os_str().is_empty() {
            return Err(Error::Config("repo_dir must not be empty".to_string()));
        }
        if self.read_workers == 0 {
            return Err(Error::Config("read_workers must be at least 1".to_string()));
        }
        if self.app_name.trim().is_empty() {
            return Err(Error::Config("app_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// git invocation timeout, if configured
    pub fn git_timeout(&self) -> Option<Duration> {
        self.git_timeout_secs.map(Duration::from_secs)
    }

    /// Locate the configured git binary
    ///
    /// Bare names are looked up on `PATH`. Returns `None` (auditing off)
    /// when unset or not found.
    pub fn resolve_git(&self) -> Option<PathBuf> {
        let git = self.git_path.as_ref()?;
        if git.components().count() > 1 {
            if git.exists() {
                return Some(git.clone());
            }
            warn!("Configured git {} does not exist; auditing disabled", git.display());
            return None;
        }
        match which::which(git) {
            Ok(found) => Some(found),
            Err(e) => {
                warn!("git '{}' not found on PATH ({}); auditing disabled", git.display(), e);
                None
            }
        }
    }
}

// src/cli/mod.rs
//! CLI definitions for munkiadmin
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! Record commands (any kind):
//! - `list`, `show`, `create`, `put`, `patch`, `delete`, `query`
//!
//! Catalog commands:
//! - `catalogs`, `catalog-info`, `ref-count`, `install-items`
//!
//! Pkginfo commands:
//! - `pkgsinfo` - Aggregated name/version index
//! - `mass-delete` / `edit-catalogs` - Bulk edits

use clap::{Args, Parser, Subcommand};
use munkiadmin::RecordKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "munkiadmin")]
#[command(author = "MunkiAdmin Contributors")]
#[command(version)]
#[command(about = "Administer a Munki software-deployment repository", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub actor: ActorArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the repository is and how to audit it
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// Configuration file (default: ~/.config/munkiadmin/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Repository root; overrides the configuration file
    #[arg(short, long, global = true, value_name = "DIR")]
    pub repo_dir: Option<PathBuf>,

    /// git binary used for change auditing
    #[arg(long, global = true, value_name = "PATH")]
    pub git: Option<PathBuf>,

    /// Do not commit changes to git even if configured
    #[arg(long, global = true)]
    pub no_audit: bool,
}

/// Identity recorded on changes; nothing is audited without `--user`
#[derive(Args, Debug, Clone, Default)]
pub struct ActorArgs {
    /// Login name of the acting user
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[arg(long, global = true)]
    pub first_name: Option<String>,

    #[arg(long, global = true)]
    pub last_name: Option<String>,

    #[arg(long, global = true)]
    pub email: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    // =========================================================================
    // Record Commands
    // =========================================================================
    /// List records of a kind
    List {
        /// manifests, pkgsinfo, catalogs, icons or pkgs
        kind: RecordKind,
    },

    /// Show one record
    Show {
        kind: RecordKind,

        /// Path relative to the kind directory
        path: String,

        /// Print structured records as JSON instead of XML
        #[arg(long)]
        json: bool,
    },

    /// Create a record; structured kinds get defaults without --from
    Create {
        kind: RecordKind,
        path: String,

        /// Initial content: a JSON object for structured kinds, raw bytes for blobs
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },

    /// Overwrite a record with the contents of a file
    Put {
        kind: RecordKind,
        path: String,

        /// Source file (plist bytes, JSON with --json, or blob bytes)
        file: PathBuf,

        /// Treat the source as JSON and convert it to a plist
        #[arg(long)]
        json: bool,
    },

    /// Merge top-level keys from a JSON object into a record
    Patch {
        kind: RecordKind,
        path: String,

        /// JSON object with the keys to replace
        file: PathBuf,
    },

    /// Delete a record
    Delete { kind: RecordKind, path: String },

    /// Query structured records with key=value filters
    Query {
        kind: RecordKind,

        /// Filters such as name=Firefox; api_fields=name,version selects fields
        terms: Vec<String>,
    },

    // =========================================================================
    // Catalog Commands
    // =========================================================================
    /// List catalog names
    Catalogs,

    /// Show suggested/update/versioned names per catalog with global facets
    CatalogInfo,

    /// Count pkginfo records referencing an installer item
    RefCount {
        /// Path relative to the pkgs directory
        pkg_path: String,
    },

    /// Show install-item names valid for a manifest
    InstallItems { manifest: String },

    // =========================================================================
    // Pkginfo Commands
    // =========================================================================
    /// Show every item with its versions, newest first
    Pkgsinfo {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete several pkginfo records
    MassDelete {
        #[arg(required = true)]
        paths: Vec<String>,

        /// Also delete installer items no other pkginfo references
        #[arg(long)]
        delete_pkgs: bool,
    },

    /// Add and remove catalogs on several pkginfo records
    EditCatalogs {
        #[arg(required = true)]
        paths: Vec<String>,

        /// Catalog to add (repeatable)
        #[arg(long = "add", value_name = "CATALOG")]
        add: Vec<String>,

        /// Catalog to remove (repeatable)
        #[arg(long = "remove", value_name = "CATALOG")]
        remove: Vec<String>,
    },
}

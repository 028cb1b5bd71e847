// src/lib.rs

//! MunkiAdmin repository engine
//!
//! Filesystem-backed administration of a Munki software-deployment
//! repository: manifests, pkginfo records, catalogs, icons and installer
//! payloads laid out under one root directory.
//!
//! # Architecture
//!
//! - Files are the source of truth: no database, no in-memory cache
//! - Stores: `PlistStore` for structured records, `FileStore` for blobs
//! - Catalog index: read-only facets over the catalog files
//! - Pkginfo index: name/version aggregation with an `all`-catalog fast
//!   path, plus partial-failure-tolerant bulk edits
//! - Audit: optional best-effort git commits attributed to the acting user

pub mod audit;
pub mod bulk;
pub mod catalog;
pub mod config;
pub mod convert;
mod error;
pub mod kind;
pub mod manifest;
pub mod pkginfo;
pub mod query;
pub mod record;
pub mod repo;
pub mod status;
pub mod store;
pub mod version;
pub mod walk;

pub use audit::{Actor, ChangeAuditor, ChangeKind, GitAuditor};
pub use bulk::{BulkReport, ItemOutcome};
pub use catalog::{CatalogFacets, CatalogIndex, CatalogInfo};
pub use config::RepoConfig;
pub use error::{BulkFamily, Error, ErrorKind, Result};
pub use kind::RecordKind;
pub use manifest::ManifestStore;
pub use pkginfo::{AggregateSource, PackageGroup, PackageVersion, PkginfoIndex};
pub use query::RecordQuery;
pub use repo::{RepoLayout, Repository, ALL_CATALOG};
pub use status::{
    CallbackStatus, LogStatus, ProcessStatus, SilentStatus, StatusBoard, StatusEvent, StatusSink,
};
pub use store::{FileStore, PlistStore, RecordReader};
pub use version::LooseVersion;

// src/error.rs

//! Error family shared by every repository operation
//!
//! All failures are a single `Error` type with a discriminating kind.
//! Parse failures of structured files are never errors (reads are tolerant);
//! filesystem failures always are, except inside bulk operations where they
//! are collected and surfaced once as `Error::Aggregate`.

use crate::kind::RecordKind;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which family of failure a bulk operation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkFamily {
    /// Per-item writes (catalog edits)
    Write,
    /// Per-item deletions (mass delete)
    Delete,
}

impl fmt::Display for BulkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkFamily::Write => write!(f, "write"),
            BulkFamily::Delete => write!(f, "delete"),
        }
    }
}

/// Errors that can occur while working with a repository
#[derive(Debug, Error)]
pub enum Error {
    #[error("Read failed for {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("Write failed for {path}: {source}")]
    Write { path: String, source: io::Error },

    #[error("Delete failed for {path}: {source}")]
    Delete { path: String, source: io::Error },

    #[error("{0} does not exist")]
    DoesNotExist(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Bulk {family} failed for {} item(s): {}", .messages.len(), .messages.join("; "))]
    Aggregate {
        family: BulkFamily,
        messages: Vec<String>,
    },

    #[error("Could not encode {path}: {source}")]
    Encode { path: String, source: plist::Error },

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("{kind} does not hold {expected} records")]
    UnsupportedKind {
        kind: RecordKind,
        expected: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Fieldless discriminant of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Read,
    Write,
    Delete,
    DoesNotExist,
    AlreadyExists,
    Aggregate,
    InvalidInput,
    Config,
}

impl ErrorKind {
    /// Status code an HTTP front-end is expected to map this kind to
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::DoesNotExist => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::InvalidInput => 400,
            ErrorKind::Config => 500,
            ErrorKind::Read | ErrorKind::Write | ErrorKind::Delete | ErrorKind::Aggregate => 403,
        }
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Read { .. } => ErrorKind::Read,
            Error::Write { .. } | Error::Encode { .. } => ErrorKind::Write,
            Error::Delete { .. } => ErrorKind::Delete,
            Error::DoesNotExist(_) => ErrorKind::DoesNotExist,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::Aggregate { .. } => ErrorKind::Aggregate,
            Error::InvalidPath { .. } | Error::InvalidQuery(_) | Error::UnsupportedKind { .. } => {
                ErrorKind::InvalidInput
            }
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Per-item messages of a bulk failure; empty for every other error
    pub fn messages(&self) -> &[String] {
        match self {
            Error::Aggregate { messages, .. } => messages,
            _ => &[],
        }
    }
}

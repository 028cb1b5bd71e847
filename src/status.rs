// src/status.rs

//! Status reporting for long-running scans
//!
//! Listing and aggregation report what they are doing through a
//! [`StatusSink`], keyed by an operation tag (e.g. `pkgsinfo_list_process`).
//! The reports are fire-and-forget: no operation depends on them.
//!
//! # Design
//!
//! Implementations:
//! - `SilentStatus`: no-op for scripted use and tests
//! - `LogStatus`: logs every report to tracing
//! - `CallbackStatus`: forwards reports to a closure
//! - `StatusBoard`: in-memory table polled by a front-end

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

/// Tag for pkgsinfo listing and aggregation
pub const PKGSINFO_STATUS_TAG: &str = "pkgsinfo_list_process";

/// Tag for manifest listing
pub const MANIFEST_LIST_STATUS_TAG: &str = "manifest_list_process";

/// Receiver of status reports
///
/// Implementations must be thread-safe (Send + Sync); reports may arrive
/// from worker threads.
pub trait StatusSink: Send + Sync {
    /// Upsert the status for `tag`
    ///
    /// `None` leaves the previously recorded value in place.
    fn record(&self, tag: &str, message: Option<&str>, percent_done: Option<u8>);

    /// Convenience for message-only reports
    fn message(&self, tag: &str, message: &str) {
        self.record(tag, Some(message), None);
    }
}

/// Silent status sink (no-op)
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentStatus;

impl StatusSink for SilentStatus {
    fn record(&self, _tag: &str, _message: Option<&str>, _percent_done: Option<u8>) {}
}

/// Logging status sink
///
/// Messages go to tracing at debug level, percentages at info.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn record(&self, tag: &str, message: Option<&str>, percent_done: Option<u8>) {
        if let Some(message) = message {
            debug!("{}: {}", tag, message);
        }
        if let Some(percent) = percent_done {
            info!("{}: {}%", tag, percent);
        }
    }
}

/// Events emitted by [`CallbackStatus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub tag: String,
    pub message: Option<String>,
    pub percent_done: Option<u8>,
}

/// Callback-based status sink
pub struct CallbackStatus<F>
where
    F: Fn(StatusEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackStatus<F>
where
    F: Fn(StatusEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> StatusSink for CallbackStatus<F>
where
    F: Fn(StatusEvent) + Send + Sync,
{
    fn record(&self, tag: &str, message: Option<&str>, percent_done: Option<u8>) {
        (self.callback)(StatusEvent {
            tag: tag.to_string(),
            message: message.map(str::to_string),
            percent_done,
        });
    }
}

/// State of one tracked long-running process
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ProcessStatus {
    pub name: String,
    pub pid: u32,
    pub exited: bool,
    pub exit_code: i32,
    pub status_text: String,
    pub percent_done: u8,
}

/// In-memory status table keyed by tag
#[derive(Debug, Default)]
pub struct StatusBoard {
    rows: RwLock<HashMap<String, ProcessStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status for `tag`
    pub fn get(&self, tag: &str) -> Option<ProcessStatus> {
        self.rows
            .read()
            .ok()
            .and_then(|rows| rows.get(tag).cloned())
    }

    /// Status text for `tag`, or `"Processing"` when nothing was recorded yet
    pub fn status_text(&self, tag: &str) -> String {
        self.get(tag)
            .map(|row| row.status_text)
            .unwrap_or_else(|| "Processing".to_string())
    }

    /// Record that the process behind `tag` has exited
    pub fn mark_exited(&self, tag: &str, exit_code: i32) {
        if let Ok(mut rows) = self.rows.write() {
            let row = rows.entry(tag.to_string()).or_insert_with(|| ProcessStatus {
                name: tag.to_string(),
                ..Default::default()
            });
            row.exited = true;
            row.exit_code = exit_code;
        }
    }

    /// Drop every row whose process has exited
    pub fn remove_exited(&self) -> usize {
        match self.rows.write() {
            Ok(mut rows) => {
                let before = rows.len();
                rows.retain(|_, row| !row.exited);
                before - rows.len()
            }
            Err(_) => 0,
        }
    }
}

impl StatusSink for StatusBoard {
    fn record(&self, tag: &str, message: Option<&str>, percent_done: Option<u8>) {
        // A poisoned table only loses status text
        let Ok(mut rows) = self.rows.write() else {
            return;
        };
        let row = rows.entry(tag.to_string()).or_insert_with(|| ProcessStatus {
            name: tag.to_string(),
            pid: std::process::id(),
            ..Default::default()
        });
        if let Some(message) = message {
            row.status_text = message.to_string();
        }
        if let Some(percent) = percent_done {
            row.percent_done = percent.min(100);
        }
    }
}

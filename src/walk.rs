// src/walk.rs

//! Directory walks over a kind directory
//!
//! Hidden entries (any name starting with `.`) are skipped and hidden
//! directories are never descended into. Paths come back relative to the
//! walk root with `/` separators, in file-name order. Symlinked
//! directories are followed; walkdir detects loops and the offending
//! entry is skipped.

use crate::status::StatusSink;
use std::path::{Component, Path};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// Join the components of `path` with forward slashes
pub fn to_posix(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lazily walk `root`, yielding relative file paths
///
/// Each directory visited is reported to `status` under `tag`. The
/// returned iterator is finite; call again to restart the walk.
pub fn walk_files<'a>(
    root: &'a Path,
    tag: &'a str,
    status: &'a dyn StatusSink,
) -> impl Iterator<Item = String> + 'a {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(move |entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                if e.loop_ancestor().is_some() {
                    warn!("Skipping symlink loop under {}: {}", root.display(), e);
                } else if e.depth() > 0 {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                } else {
                    debug!("Cannot walk {}: {}", root.display(), e);
                }
                None
            }
        })
        .filter_map(move |entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            if entry.file_type().is_dir() {
                status.message(tag, &format!("Scanning {}...", to_posix(relative)));
                return None;
            }
            Some(to_posix(relative))
        })
}

/// Collect every file under `root`
pub fn list_files(root: &Path, tag: &str, status: &dyn StatusSink) -> Vec<String> {
    walk_files(root, tag, status).collect()
}

// src/commands/mod.rs
//! Command handlers for the munkiadmin CLI

mod catalogs;
mod pkgsinfo;
mod records;

use crate::cli::{ActorArgs, RepoArgs};
use anyhow::{Context, Result};
use munkiadmin::{Actor, LogStatus, RepoConfig, Repository};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

// Re-export all command handlers
pub use catalogs::{cmd_catalog_info, cmd_catalogs, cmd_install_items, cmd_ref_count};
pub use pkgsinfo::{cmd_edit_catalogs, cmd_mass_delete, cmd_pkgsinfo};
pub use records::{cmd_create, cmd_delete, cmd_list, cmd_patch, cmd_put, cmd_query, cmd_show};

/// Resolve configuration (file, then environment, then flags) and open the repository
pub fn open_repository(args: &RepoArgs) -> Result<Repository> {
    let from_file = match &args.config {
        Some(path) => Some(RepoConfig::load(path)?),
        None => match RepoConfig::default_path().filter(|path| path.is_file()) {
            Some(path) => Some(RepoConfig::load(&path)?),
            None => None,
        },
    };

    let mut config = match (from_file, &args.repo_dir) {
        (Some(config), _) => config,
        (None, Some(dir)) => RepoConfig::new(dir),
        (None, None) => RepoConfig::new(""),
    }
    .apply_env();

    if let Some(dir) = &args.repo_dir {
        config.repo_dir = dir.clone();
    }
    if let Some(git) = &args.git {
        config.git_path = Some(git.clone());
    }
    config
        .validate()
        .context("no repository configured; pass --repo-dir or set MUNKIADMIN_REPO_DIR")?;
    debug!("Using repository at {}", config.repo_dir.display());

    let repo = Repository::open(config)?.with_status(Arc::new(LogStatus));
    Ok(if args.no_audit {
        repo.without_auditor()
    } else {
        repo
    })
}

/// Actor from the identity flags, if a user was given
pub fn actor(args: &ActorArgs) -> Option<Actor> {
    let username = args.user.as_deref()?;
    let mut actor = Actor::new(username).with_name(
        args.first_name.clone().unwrap_or_default(),
        args.last_name.clone().unwrap_or_default(),
    );
    if let Some(email) = &args.email {
        actor = actor.with_email(email.clone());
    }
    Some(actor)
}

/// Read a JSON document from disk
fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Print a serializable value as pretty JSON
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// src/commands/pkgsinfo.rs

//! Pkginfo aggregation and bulk edit commands

use super::print_json;
use anyhow::Result;
use munkiadmin::{Actor, BulkFamily, ItemOutcome, Repository};
use tracing::info;

/// Show every item with its versions
pub fn cmd_pkgsinfo(repo: &Repository, json: bool) -> Result<()> {
    let (source, groups) = repo.pkgsinfo().aggregate_with_source();
    info!("Built pkgsinfo index from {:?}", source);

    if json {
        return print_json(&groups);
    }
    if groups.is_empty() {
        println!("No pkginfo items found.");
        return Ok(());
    }
    for group in &groups {
        println!("{}", group.name);
        for version in &group.versions {
            println!(
                "  {:<16} [{}]  {}",
                version.version,
                version.catalogs.join(", "),
                version.path
            );
        }
    }
    Ok(())
}

/// Delete several pkginfo records
pub fn cmd_mass_delete(
    repo: &Repository,
    actor: Option<&Actor>,
    paths: &[String],
    delete_pkgs: bool,
) -> Result<()> {
    let report = repo.pkgsinfo().mass_delete_report(paths, actor, delete_pkgs);
    for (path, outcome) in &report.outcomes {
        if *outcome == ItemOutcome::Done {
            println!("  [OK] {}", path);
        }
    }
    report.into_result(BulkFamily::Delete)?;
    Ok(())
}

/// Add and remove catalogs on several pkginfo records
pub fn cmd_edit_catalogs(
    repo: &Repository,
    actor: Option<&Actor>,
    paths: &[String],
    add: &[String],
    remove: &[String],
) -> Result<()> {
    let report = repo
        .pkgsinfo()
        .mass_edit_catalogs_report(paths, add, remove, actor);
    for (path, outcome) in &report.outcomes {
        match outcome {
            ItemOutcome::Done => println!("  [OK] {}", path),
            ItemOutcome::Unchanged => println!("  [UNCHANGED] {}", path),
            ItemOutcome::Failed(_) => {}
        }
    }
    report.into_result(BulkFamily::Write)?;
    Ok(())
}

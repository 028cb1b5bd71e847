// src/commands/catalogs.rs

//! Catalog index commands

use super::print_json;
use anyhow::Result;
use munkiadmin::Repository;

/// List catalog names
pub fn cmd_catalogs(repo: &Repository) -> Result<()> {
    let names = repo.catalogs().list_catalog_names();
    if names.is_empty() {
        println!("No catalogs found.");
        return Ok(());
    }
    for name in &names {
        println!("{}", name);
    }
    Ok(())
}

/// Print catalog facets as JSON
pub fn cmd_catalog_info(repo: &Repository) -> Result<()> {
    print_json(&repo.catalogs().catalog_info())
}

/// Print how many pkginfo records reference an installer item
pub fn cmd_ref_count(repo: &Repository, pkg_path: &str) -> Result<()> {
    let count = repo.catalogs().pkg_reference_count(pkg_path);
    println!("{}: referenced by {} pkginfo item(s)", pkg_path, count);
    Ok(())
}

/// Print install-item names valid for a manifest
pub fn cmd_install_items(repo: &Repository, manifest: &str) -> Result<()> {
    print_json(&repo.manifests().install_item_names(manifest)?)
}

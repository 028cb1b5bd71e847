// src/commands/records.rs

//! Record CRUD commands
//!
//! Structured kinds go through the plist store (manifests through the
//! manifest store so unparsable text is still shown); blob kinds through
//! the file store.

use super::{print_json, read_json};
use anyhow::{Result, anyhow, bail};
use munkiadmin::convert::{dict_to_json, from_json, object_to_dict, to_json};
use munkiadmin::record;
use munkiadmin::{Actor, RecordKind, RecordQuery, Repository};
use plist::Value;
use std::path::Path;
use tracing::{info, warn};

fn json_object(path: &Path) -> Result<plist::Dictionary> {
    match read_json(path)? {
        serde_json::Value::Object(map) => Ok(object_to_dict(&map)),
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

/// List records of a kind
pub fn cmd_list(repo: &Repository, kind: RecordKind) -> Result<()> {
    let paths = if kind.is_structured() {
        repo.plists().list(kind)?
    } else {
        repo.files().list(kind)?
    };
    if paths.is_empty() {
        println!("No {} found.", kind);
        return Ok(());
    }
    for path in &paths {
        println!("{}", path);
    }
    Ok(())
}

/// Show one record
pub fn cmd_show(repo: &Repository, kind: RecordKind, path: &str, json: bool) -> Result<()> {
    if !kind.is_structured() {
        let full_path = repo.files().full_path(kind, path)?;
        let size = repo.files().size(kind, path)?;
        println!("{} ({} bytes)", full_path.display(), size);
        return Ok(());
    }

    if json {
        let value = match kind {
            RecordKind::Pkgsinfo => Value::Dictionary(repo.plists().read_pkginfo_for_edit(path)?),
            _ => repo.plists().read(kind, path)?,
        };
        return print_json(&to_json(&value));
    }

    let text = match kind {
        RecordKind::Manifests => repo.manifests().read(path)?,
        _ => String::from_utf8_lossy(&repo.plists().read_raw(kind, path)?).into_owned(),
    };
    print!("{}", text);
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Create a record
pub fn cmd_create(
    repo: &Repository,
    actor: Option<&Actor>,
    kind: RecordKind,
    path: &str,
    from: Option<&Path>,
) -> Result<()> {
    if !kind.is_structured() {
        let source = from.ok_or_else(|| anyhow!("--from is required for {}", kind))?;
        let bytes = std::fs::read(source)?;
        repo.files().create(kind, path, &bytes, actor)?;
        println!("Stored {} bytes at {}/{}", bytes.len(), kind, path);
        return Ok(());
    }

    let data = match from {
        Some(source) => Some(json_object(source)?),
        None => None,
    };
    let xml = match kind {
        RecordKind::Manifests => repo.manifests().create(path, data, actor)?,
        _ => {
            let bytes = repo.plists().create(kind, path, data.map(Value::Dictionary), actor)?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };
    info!("Created {}/{}", kind, path);
    print!("{}", xml);
    Ok(())
}

/// Overwrite a record from a file
pub fn cmd_put(
    repo: &Repository,
    actor: Option<&Actor>,
    kind: RecordKind,
    path: &str,
    file: &Path,
    json: bool,
) -> Result<()> {
    if !kind.is_structured() {
        let bytes = std::fs::read(file)?;
        repo.files().write(kind, path, &bytes, actor)?;
        println!("Wrote {} bytes to {}/{}", bytes.len(), kind, path);
        return Ok(());
    }

    if json {
        let value = match read_json(file)? {
            serde_json::Value::Object(map) => Value::Dictionary(object_to_dict(&map)),
            list @ serde_json::Value::Array(_) if kind == RecordKind::Catalogs => {
                from_json(&list).unwrap_or(Value::Array(Vec::new()))
            }
            _ => bail!("{} must contain a JSON object", file.display()),
        };
        repo.plists().write_record(kind, path, &value, actor)?;
    } else {
        let bytes = std::fs::read(file)?;
        if record::parse(&bytes).is_none() {
            warn!("{} does not parse as a plist; writing it anyway", file.display());
        }
        repo.plists().write(kind, path, &bytes, actor)?;
    }
    println!("Wrote {}/{}", kind, path);
    Ok(())
}

/// Merge JSON keys into a record
pub fn cmd_patch(
    repo: &Repository,
    actor: Option<&Actor>,
    kind: RecordKind,
    path: &str,
    file: &Path,
) -> Result<()> {
    let partial = json_object(file)?;
    let merged = repo.plists().patch(kind, path, &partial, actor)?;
    print_json(&dict_to_json(&merged))
}

/// Delete a record
pub fn cmd_delete(
    repo: &Repository,
    actor: Option<&Actor>,
    kind: RecordKind,
    path: &str,
) -> Result<()> {
    if kind.is_structured() {
        repo.plists().delete(kind, path, actor)?;
    } else {
        repo.files().delete(kind, path, actor)?;
    }
    println!("Deleted {}/{}", kind, path);
    Ok(())
}

/// Filtered listing of structured records
pub fn cmd_query(repo: &Repository, kind: RecordKind, terms: &[String]) -> Result<()> {
    let query = RecordQuery::from_terms(terms)?;
    let results = query.run(&repo.plists(), kind)?;
    print_json(&results)
}

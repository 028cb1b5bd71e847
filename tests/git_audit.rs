// tests/git_audit.rs

//! Change auditing against a real git work tree.
//!
//! Skipped when no git binary is on PATH.

mod common;

use common::TestRepo;
use munkiadmin::{Actor, RecordKind, RepoConfig, Repository};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn git(root: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Initialize a git work tree at the repository root, or `None` without git
fn git_repo(test: &TestRepo) -> Option<Repository> {
    let binary: PathBuf = which::which("git").ok()?;
    let root = test.root();
    git(root, &["init", "-q"]);
    git(root, &["config", "user.name", "Test Runner"]);
    git(root, &["config", "user.email", "runner@example.com"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    Some(Repository::open(RepoConfig::new(root).with_git(binary)).unwrap())
}

fn log(root: &Path) -> Vec<String> {
    let out = git(root, &["log", "--format=%an <%ae>|%s"]);
    out.lines().map(str::to_string).collect()
}

#[test]
fn test_create_and_delete_are_committed() {
    let test = TestRepo::new();
    let Some(repo) = git_repo(&test) else {
        return;
    };
    let actor = Actor::new("jdoe").with_name("Jane", "Doe");

    repo.manifests().create("site_default", None, Some(&actor)).unwrap();
    repo.manifests().delete("site_default", Some(&actor)).unwrap();

    assert_eq!(
        log(test.root()),
        vec![
            "Jane Doe <jdoe@MunkiWebAdmin>|Jane Doe deleted 'manifests/site_default' via MunkiWebAdmin"
                .to_string(),
            "Jane Doe <jdoe@MunkiWebAdmin>|Jane Doe created 'manifests/site_default' via MunkiWebAdmin"
                .to_string(),
        ]
    );
}

#[test]
fn test_modification_uses_email_when_present() {
    let test = TestRepo::new();
    let Some(repo) = git_repo(&test) else {
        return;
    };
    let actor = Actor::new("admin").with_email("admin@example.org");

    repo.plists()
        .create(RecordKind::Pkgsinfo, "Foo-1.0.plist", None, Some(&actor))
        .unwrap();
    repo.plists()
        .write(RecordKind::Pkgsinfo, "Foo-1.0.plist", b"<plist/>", Some(&actor))
        .unwrap();

    let log = log(test.root());
    assert_eq!(log.len(), 2);
    assert_eq!(
        log[0],
        "admin <admin@example.org>|admin modified 'pkgsinfo/Foo-1.0.plist' via MunkiWebAdmin"
    );
}

#[test]
fn test_anonymous_and_ignored_changes_are_not_committed() {
    let test = TestRepo::new();
    let Some(repo) = git_repo(&test) else {
        return;
    };
    fs::write(test.root().join(".gitignore"), "icons/\npkgs/\ncatalogs/\n").unwrap();
    let actor = Actor::new("jdoe");

    repo.manifests().create("anonymous", None, None).unwrap();
    repo.plists()
        .create(RecordKind::Catalogs, "testing", None, Some(&actor))
        .unwrap();

    let status = Command::new("git")
        .args(["log", "--oneline"])
        .current_dir(test.root())
        .output()
        .unwrap();
    // no commits at all: git log fails on an unborn branch
    assert!(!status.status.success() || status.stdout.is_empty());
}

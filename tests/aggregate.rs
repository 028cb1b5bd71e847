// tests/aggregate.rs

//! Pkginfo aggregation: grouping, ordering and fast/slow path selection.

mod common;

use common::{CountingReader, TestRepo};
use munkiadmin::{AggregateSource, PackageVersion, RecordKind};
use std::fs;

const OLD: i64 = 1_600_000_000;
const NEW: i64 = 1_700_000_000;

fn foo_repo() -> TestRepo {
    let test = TestRepo::new();
    let a1 = test.write_pkginfo("A-1.0.plist", "Foo", "1.0", &["testing"], None);
    let a2 = test.write_pkginfo("A-2.0.plist", "Foo", "2.0", &["production"], None);
    // all catalog lists items in pkgsinfo path order
    test.write_catalog("all", vec![a1, a2]);

    test.set_mtime(RecordKind::Pkgsinfo, "A-1.0.plist", OLD);
    test.set_mtime(RecordKind::Pkgsinfo, "A-2.0.plist", OLD);
    test.set_mtime(RecordKind::Catalogs, "all", NEW);
    test
}

fn expected_foo() -> Vec<PackageVersion> {
    vec![
        PackageVersion {
            version: "2.0".to_string(),
            catalogs: vec!["production".to_string()],
            path: "A-2.0.plist".to_string(),
        },
        PackageVersion {
            version: "1.0".to_string(),
            catalogs: vec!["testing".to_string()],
            path: "A-1.0.plist".to_string(),
        },
    ]
}

#[test]
fn test_foo_scenario_single_group_newest_first() {
    let test = foo_repo();
    let groups = test.repo.pkgsinfo().aggregate();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Foo");
    assert_eq!(groups[0].versions, expected_foo());
}

#[test]
fn test_fast_path_reads_no_pkginfo_files() {
    let test = foo_repo();
    let reader = CountingReader::new(&test.repo);

    let (source, groups) = test
        .repo
        .pkgsinfo()
        .with_reader(&reader)
        .aggregate_with_source();

    assert_eq!(source, AggregateSource::AllCatalog);
    assert_eq!(reader.reads(), 0);
    assert_eq!(groups[0].versions, expected_foo());
}

#[test]
fn test_newer_pkginfo_forces_slow_path() {
    let test = foo_repo();
    test.set_mtime(RecordKind::Pkgsinfo, "A-1.0.plist", NEW + 10);
    let reader = CountingReader::new(&test.repo);

    let (source, groups) = test
        .repo
        .pkgsinfo()
        .with_reader(&reader)
        .aggregate_with_source();

    assert_eq!(source, AggregateSource::PkginfoFiles);
    assert_eq!(reader.reads(), 2);
    assert_eq!(groups[0].versions, expected_foo());
}

#[test]
fn test_equal_mtime_keeps_fast_path() {
    let test = foo_repo();
    test.set_mtime(RecordKind::Pkgsinfo, "A-2.0.plist", NEW);
    let reader = CountingReader::new(&test.repo);

    let (source, _) = test
        .repo
        .pkgsinfo()
        .with_reader(&reader)
        .aggregate_with_source();
    assert_eq!(source, AggregateSource::AllCatalog);
    assert_eq!(reader.reads(), 0);
}

#[test]
fn test_count_mismatch_forces_slow_path() {
    let test = foo_repo();
    test.write_pkginfo("B-1.0.plist", "Bar", "1.0", &["testing"], None);
    test.set_mtime(RecordKind::Pkgsinfo, "B-1.0.plist", OLD);
    let reader = CountingReader::new(&test.repo);

    let (source, groups) = test
        .repo
        .pkgsinfo()
        .with_reader(&reader)
        .aggregate_with_source();

    assert_eq!(source, AggregateSource::PkginfoFiles);
    assert_eq!(reader.reads(), 3);
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Bar", "Foo"]);
}

#[test]
fn test_missing_all_catalog_uses_slow_path() {
    let test = foo_repo();
    fs::remove_file(test.path(RecordKind::Catalogs, "all")).unwrap();

    let (source, groups) = test.repo.pkgsinfo().aggregate_with_source();
    assert_eq!(source, AggregateSource::PkginfoFiles);
    assert_eq!(groups[0].versions, expected_foo());
}

#[test]
fn test_corrupt_files_are_skipped() {
    let test = TestRepo::new();
    test.write_pkginfo("apps/Foo-1.0.plist", "Foo", "1.0", &["testing"], None);
    fs::write(test.path(RecordKind::Pkgsinfo, "apps/Broken.plist"), b"not a plist").unwrap();
    fs::write(test.path(RecordKind::Pkgsinfo, ".hidden.plist"), b"ignored").unwrap();

    let groups = test.repo.pkgsinfo().aggregate();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].versions[0].path, "apps/Foo-1.0.plist");
}

#[test]
fn test_loose_version_ordering_within_group() {
    let test = TestRepo::new();
    for (file, version) in [
        ("Foo-1.9.plist", "1.9"),
        ("Foo-1.10.plist", "1.10"),
        ("Foo-1.0b2.plist", "1.0b2"),
        ("Foo-10.0.plist", "10.0"),
    ] {
        test.write_pkginfo(file, "Foo", version, &[], None);
    }

    let groups = test.repo.pkgsinfo().aggregate();
    let versions: Vec<&str> = groups[0].versions.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(versions, vec!["10.0", "1.10", "1.9", "1.0b2"]);
}

#[test]
fn test_missing_fields_get_placeholders() {
    let test = TestRepo::new();
    common::write_plist(
        &test.path(RecordKind::Pkgsinfo, "anon.plist"),
        &plist::Value::Dictionary(plist::Dictionary::new()),
    );

    let groups = test.repo.pkgsinfo().aggregate();
    assert_eq!(groups[0].name, "NO_NAME");
    assert_eq!(groups[0].versions[0].version, "NO_VERSION");
}

#[test]
fn test_status_messages_are_reported() {
    use munkiadmin::StatusBoard;
    use std::sync::Arc;

    let board = Arc::new(StatusBoard::new());
    let test = foo_repo();
    let repo = munkiadmin::Repository::open(munkiadmin::RepoConfig::new(test.root()))
        .unwrap()
        .with_status(board.clone());

    repo.pkgsinfo().aggregate();
    assert_eq!(
        board.status_text("pkgsinfo_list_process"),
        "Completed assembly of pkgsinfo data"
    );
}

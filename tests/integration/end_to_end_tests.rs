use clap::Parser;
use ddet::cli::Cli;
use ddet::duplicates::{DuplicateIndex, DuplicateKey};
use ddet::error::ExitCode;
use ddet::filter::FilterConfig;
use ddet::scanner::{hash_bytes, Scanner, ScannerConfig};
use ddet::store::{RecordStore, SqliteStore};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const X: &[u8] = b"twenty-three bytes long";
const Y: &[u8] = b"twenty-four bytes long!!";

fn analyse(store: &dyn RecordStore, prefix: &str) -> DuplicateIndex {
    let mut index = DuplicateIndex::new(FilterConfig::default()).unwrap();
    index.add_all(store, prefix).unwrap();
    index
}

fn path_key(path: &Path) -> String {
    fs::canonicalize(path).unwrap().to_str().unwrap().to_string()
}

#[test]
fn test_detect_then_forget_deleted_duplicate() {
    assert_eq!(X.len(), 23);
    assert_eq!(Y.len(), 24);

    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    fs::write(tree.join("A"), X).unwrap();
    fs::write(tree.join("B"), X).unwrap();
    fs::write(tree.join("C"), Y).unwrap();
    let a = path_key(&tree.join("A"));
    let b = path_key(&tree.join("B"));

    let store = Arc::new(SqliteStore::open(&dir.path().join("ddet.db")).unwrap());
    let scanner = Scanner::new(store.clone(), ScannerConfig::default());

    let report = scanner.scan(&tree).unwrap();
    assert_eq!(store.count().unwrap(), 3);

    let index = analyse(store.as_ref(), &report.prefix);
    let groups = index.groups(store.as_ref()).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, DuplicateKey::new(hash_bytes(X), 23));
    assert_eq!(groups[0].paths().collect::<Vec<_>>(), vec![a.as_str(), b.as_str()]);

    fs::remove_file(tree.join("B")).unwrap();
    let report = scanner.scan(&tree).unwrap();
    assert_eq!(report.stats.deleted, 1);
    assert_eq!(store.count().unwrap(), 2);

    let index = analyse(store.as_ref(), &report.prefix);
    assert!(index.duplicate_keys().is_empty());
}

#[test]
fn test_second_run_reuses_stored_hashes() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    fs::write(tree.join("A"), X).unwrap();
    fs::write(tree.join("B"), X).unwrap();
    let db = dir.path().join("ddet.db");

    {
        let store = Arc::new(SqliteStore::open(&db).unwrap());
        let report = Scanner::new(store, ScannerConfig::default())
            .scan(&tree)
            .unwrap();
        assert_eq!(report.stats.added, 2);
    }

    let store = Arc::new(SqliteStore::open(&db).unwrap());
    let report = Scanner::new(store.clone(), ScannerConfig::default())
        .scan(&tree)
        .unwrap();
    assert_eq!(report.stats.added, 0);
    assert_eq!(report.stats.updated, 0);
    assert_eq!(report.stats.hashed(), 0);

    let index = analyse(store.as_ref(), &report.prefix);
    assert_eq!(index.duplicate_keys().len(), 1);
}

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["ddet", "--quiet", "--no-progress"];
    argv.extend_from_slice(args);
    ddet::run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_run_app_exit_codes() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    fs::write(tree.join("A"), X).unwrap();
    fs::write(tree.join("C"), Y).unwrap();
    let tree_arg = tree.to_str().unwrap();

    assert_eq!(run(&["--no-db", tree_arg]).unwrap(), ExitCode::NoDuplicates);

    fs::write(tree.join("B"), X).unwrap();
    assert_eq!(run(&["--no-db", tree_arg]).unwrap(), ExitCode::Success);
}

#[test]
fn test_run_app_with_database_and_json() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    fs::write(tree.join("A"), X).unwrap();
    fs::write(tree.join("B"), X).unwrap();
    let db = dir.path().join("state").join("ddet.db");

    let code = run(&[
        "--db",
        db.to_str().unwrap(),
        "--output",
        "json",
        tree.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(db.exists());

    let store = SqliteStore::open(&db).unwrap();
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_run_app_clear_db_forgets_other_trees() {
    let dir = tempdir().unwrap();
    let one = dir.path().join("one");
    let two = dir.path().join("two");
    fs::create_dir(&one).unwrap();
    fs::create_dir(&two).unwrap();
    fs::write(one.join("f"), "in one").unwrap();
    fs::write(two.join("g"), "in two").unwrap();
    let db = dir.path().join("ddet.db");
    let db_arg = db.to_str().unwrap();

    run(&["--db", db_arg, one.to_str().unwrap()]).unwrap();
    run(&["--db", db_arg, two.to_str().unwrap()]).unwrap();
    assert_eq!(SqliteStore::open(&db).unwrap().count().unwrap(), 2);

    run(&["--db", db_arg, "--clear-db", two.to_str().unwrap()]).unwrap();
    assert_eq!(SqliteStore::open(&db).unwrap().count().unwrap(), 1);
}

#[test]
fn test_run_app_missing_root_is_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");
    assert!(run(&["--no-db", missing.to_str().unwrap()]).is_err());
}

#[test]
fn test_run_app_rejects_invalid_filter() {
    let dir = tempdir().unwrap();
    let err = run(&[
        "--no-db",
        "--filter-slots",
        "0",
        dir.path().to_str().unwrap(),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("Invalid configuration"));
}

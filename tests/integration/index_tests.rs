use ddet::duplicates::{DuplicateIndex, DuplicateKey, IndexError};
use ddet::filter::FilterConfig;
use ddet::scanner::hash_bytes;
use ddet::store::{ContentHash, FileRecord, MemoryStore, RecordStore, SqliteStore, StoreError};
use tempfile::tempdir;

fn record(path: &str, content: &[u8]) -> FileRecord {
    FileRecord::new(path, content.len() as u64, 1, hash_bytes(content), 1)
}

#[test]
fn test_groups_by_hash_and_length() {
    let store = MemoryStore::new();
    store
        .upsert_batch(&[
            record("/d/a", b"same content"),
            record("/d/b", b"same content"),
            record("/d/c", b"different"),
            record("/d/sub/e", b"same content"),
        ])
        .unwrap();

    let mut index = DuplicateIndex::new(FilterConfig::default()).unwrap();
    index.add_all(&store, "/d/").unwrap();

    let groups = index.groups(&store).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].key,
        DuplicateKey::new(hash_bytes(b"same content"), 12)
    );
    assert_eq!(
        groups[0].paths().collect::<Vec<_>>(),
        vec!["/d/a", "/d/b", "/d/sub/e"]
    );

    let stats = index.stats();
    assert_eq!(stats.files_total, 4);
    assert_eq!(stats.confirmed, 1);
}

#[test]
fn test_no_duplicates_yields_empty_keys() {
    let store = MemoryStore::new();
    store
        .upsert_batch(&[record("/d/a", b"one"), record("/d/b", b"two!")])
        .unwrap();

    let mut index = DuplicateIndex::new(FilterConfig::default()).unwrap();
    index.add_all(&store, "/d/").unwrap();

    assert!(index.duplicate_keys().is_empty());
    assert!(index.groups(&store).unwrap().is_empty());
    assert_eq!(index.files_total(), 2);
}

#[test]
fn test_tiny_filter_still_gives_exact_groups() {
    let store = MemoryStore::new();
    let mut records = Vec::new();
    for i in 0..50u32 {
        records.push(record(&format!("/d/{:02}", i), &i.to_le_bytes()));
    }
    records.push(record("/d/dup1", b"shared"));
    records.push(record("/d/dup2", b"shared"));
    store.upsert_batch(&records).unwrap();

    // Two slots make nearly every key a candidate.
    let mut index = DuplicateIndex::new(FilterConfig::new(2, 1)).unwrap();
    index.add_all(&store, "/d/").unwrap();

    assert_eq!(
        index.duplicate_keys(),
        vec![DuplicateKey::new(hash_bytes(b"shared"), 6)]
    );
    assert!(index.stats().false_positives > 0);
}

#[test]
fn test_prefix_limits_detection_not_membership() {
    let store = MemoryStore::new();
    store
        .upsert_batch(&[
            record("/in/a", b"payload"),
            record("/in/b", b"payload"),
            record("/out/c", b"payload"),
            record("/in/x", b"lonely"),
            record("/out/y", b"lonely"),
        ])
        .unwrap();

    let mut index = DuplicateIndex::new(FilterConfig::default()).unwrap();
    index.add_all(&store, "/in/").unwrap();

    // "lonely" repeats only across the prefix boundary.
    let keys = index.duplicate_keys();
    assert_eq!(keys, vec![DuplicateKey::new(hash_bytes(b"payload"), 7)]);

    let members = index.group_members(&store, &keys[0]).unwrap();
    let paths: Vec<&str> = members.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/in/a", "/in/b", "/out/c"]);
}

#[test]
fn test_malformed_hash_aborts_and_resets() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("records.db");
    let store = SqliteStore::open(&db).unwrap();
    store
        .upsert_batch(&[record("/d/a", b"abc"), record("/d/b", b"abc")])
        .unwrap();

    let mut index = DuplicateIndex::new(FilterConfig::default()).unwrap();
    index.add_all(&store, "/d/").unwrap();
    assert_eq!(index.duplicate_keys().len(), 1);

    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute(
            "INSERT INTO files (path, length, last_modified, content_hash, scan_time)
             VALUES ('/d/c', 3, 4, 'AXB1', 5)",
            [],
        )
        .unwrap();
    }

    let err = index.add_all(&store, "/d/").unwrap_err();
    match err {
        IndexError::Store(StoreError::Decode { path, value }) => {
            assert_eq!(path, "/d/c");
            assert_eq!(value, "AXB1");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(index.duplicate_keys().is_empty());
    assert_eq!(index.files_total(), 0);
}

#[test]
fn test_repeated_add_all_accumulates_without_double_counting() {
    let store = MemoryStore::new();
    store
        .upsert_batch(&[
            record("/p/a", b"twin"),
            record("/p/b", b"twin"),
            record("/q/a", b"pair"),
            record("/q/b", b"pair"),
        ])
        .unwrap();

    let mut index = DuplicateIndex::new(FilterConfig::default()).unwrap();
    index.add_all(&store, "/p/").unwrap();
    index.add_all(&store, "/q/").unwrap();
    index.add_all(&store, "/p/").unwrap();

    let groups = index.groups(&store).unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.len() == 2));
}

#[test]
fn test_same_hash_different_length_is_not_a_group() {
    let hash = ContentHash::new([3; 16]);
    let store = MemoryStore::new();
    store
        .upsert_batch(&[
            FileRecord::new("/d/a", 10, 1, hash, 1),
            FileRecord::new("/d/b", 11, 1, hash, 1),
        ])
        .unwrap();

    let mut index = DuplicateIndex::new(FilterConfig::default()).unwrap();
    index.add_all(&store, "/d/").unwrap();
    assert!(index.duplicate_keys().is_empty());
}

//! Behavior shared by every record store implementation.

use ddet::store::{ContentHash, FileRecord, MemoryStore, RecordStore, SqliteStore};
use tempfile::{tempdir, TempDir};

fn hash(byte: u8) -> ContentHash {
    ContentHash::new([byte; 16])
}

fn record(path: &str, length: u64, byte: u8, scan_time: i64) -> FileRecord {
    FileRecord::new(path, length, 1_700_000_000, hash(byte), scan_time)
}

fn paths_under(store: &dyn RecordStore, prefix: &str) -> Vec<String> {
    let mut paths = Vec::new();
    store
        .for_each_under_prefix(prefix, &mut |r| paths.push(r.path))
        .unwrap();
    paths
}

fn round_trip(store: &dyn RecordStore) {
    let original = FileRecord::new("/data/a.txt", 23, 1_234_567, hash(0x5a), 42);
    store.upsert(&original).unwrap();

    let loaded = store.get("/data/a.txt").unwrap().unwrap();
    assert_eq!(loaded, original);
    assert!(store.get("/data/missing").unwrap().is_none());
}

fn upsert_replaces(store: &dyn RecordStore) {
    store.upsert(&record("/data/a", 10, 1, 1)).unwrap();
    store.upsert(&record("/data/a", 20, 2, 2)).unwrap();

    assert_eq!(store.count().unwrap(), 1);
    let loaded = store.get("/data/a").unwrap().unwrap();
    assert_eq!(loaded.length, 20);
    assert_eq!(loaded.content_hash, hash(2));
}

fn prefix_streaming_is_ordered(store: &dyn RecordStore) {
    store
        .upsert_batch(&[
            record("/x/b/2", 1, 1, 1),
            record("/x/a/1", 1, 1, 1),
            record("/y/z", 1, 1, 1),
            record("/x/ab", 1, 1, 1),
            record("/x/b/1", 1, 1, 1),
        ])
        .unwrap();

    assert_eq!(
        paths_under(store, "/x/"),
        vec!["/x/a/1", "/x/ab", "/x/b/1", "/x/b/2"]
    );
    assert_eq!(paths_under(store, "/x/a/"), vec!["/x/a/1"]);
    // Raw string prefix: a sibling sharing the characters matches.
    assert_eq!(paths_under(store, "/x/a"), vec!["/x/a/1", "/x/ab"]);
    assert!(paths_under(store, "/nothing/").is_empty());
    assert_eq!(paths_under(store, "").len(), 5);
}

fn stale_deletion_is_scoped(store: &dyn RecordStore) {
    store
        .upsert_batch(&[
            record("/x/a/old", 1, 1, 5),
            record("/x/a/new", 1, 1, 10),
            record("/x/ab/old", 1, 1, 5),
            record("/y/old", 1, 1, 5),
        ])
        .unwrap();

    let deleted = store.delete_stale_under_prefix("/x/a/", 10).unwrap();

    assert_eq!(deleted, 1);
    assert!(store.get("/x/a/old").unwrap().is_none());
    assert!(store.get("/x/a/new").unwrap().is_some());
    assert!(store.get("/x/ab/old").unwrap().is_some());
    assert!(store.get("/y/old").unwrap().is_some());
    assert_eq!(store.delete_stale_under_prefix("/x/a/", 10).unwrap(), 0);
}

fn get_by_key_is_exact_and_sorted(store: &dyn RecordStore) {
    store
        .upsert_batch(&[
            record("/d/c", 100, 7, 1),
            record("/d/a", 100, 7, 1),
            record("/d/b", 101, 7, 1),
            record("/d/e", 100, 8, 1),
        ])
        .unwrap();

    let matches = store.get_by_key(&hash(7), 100).unwrap();
    let paths: Vec<&str> = matches.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/d/a", "/d/c"]);
    assert!(store.get_by_key(&hash(9), 100).unwrap().is_empty());
}

fn latest_scan_time_tracks_max(store: &dyn RecordStore) {
    assert_eq!(store.latest_scan_time().unwrap(), None);
    store
        .upsert_batch(&[record("/a", 1, 1, 30), record("/b", 1, 1, 70), record("/c", 1, 1, 50)])
        .unwrap();
    assert_eq!(store.latest_scan_time().unwrap(), Some(70));
}

fn empty_batch_is_noop(store: &dyn RecordStore) {
    store.upsert_batch(&[]).unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

fn sqlite() -> (TempDir, SqliteStore) {
    let dir = tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("records.db")).unwrap();
    (dir, store)
}

macro_rules! store_conformance {
    ($($name:ident),* $(,)?) => {
        mod sqlite_store {
            use super::*;
            $(
                #[test]
                fn $name() {
                    let (_dir, store) = sqlite();
                    super::$name(&store);
                }
            )*
        }

        mod memory_store {
            use super::*;
            $(
                #[test]
                fn $name() {
                    super::$name(&MemoryStore::new());
                }
            )*
        }
    };
}

store_conformance!(
    round_trip,
    upsert_replaces,
    prefix_streaming_is_ordered,
    stale_deletion_is_scoped,
    get_by_key_is_exact_and_sorted,
    latest_scan_time_tracks_max,
    empty_batch_is_noop,
);

#[test]
fn test_sqlite_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("records.db");
    {
        let store = SqliteStore::open(&db).unwrap();
        store.upsert(&record("/keep/me", 3, 4, 9)).unwrap();
    }

    let store = SqliteStore::open(&db).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.get("/keep/me").unwrap().unwrap().scan_time, 9);
}

#[test]
fn test_sqlite_store_shared_across_threads() {
    let (_dir, store) = sqlite();
    std::thread::scope(|s| {
        for t in 0..4u8 {
            let store = &store;
            s.spawn(move || {
                for i in 0..25 {
                    store
                        .upsert(&record(&format!("/t{}/{:02}", t, i), 1, t, 1))
                        .unwrap();
                }
            });
        }
    });
    assert_eq!(store.count().unwrap(), 100);
}

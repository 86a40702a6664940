//! SQLite-backed record store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ContentHash, FileRecord, RecordStore, StoreError, StoreResult};

/// Bump when the table layout changes. Older databases are dropped and
/// rebuilt; every record can be recomputed by rescanning.
const SCHEMA_VERSION: i64 = 1;

const SELECT_COLUMNS: &str = "SELECT path, length, last_modified, content_hash, scan_time FROM files";

/// Persistent record store using SQLite.
///
/// All access goes through one connection guarded by a mutex; this is the
/// only synchronization point shared by concurrent scanner tasks.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a store at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created, the file is not a SQLite
    /// database, or the schema cannot be initialized.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        log::debug!("Opened record store at {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Fails if the schema cannot be initialized.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        migrate_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Remove every record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the delete fails.
    pub fn clear(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM files", [])?;
        log::info!("Cleared {} records from the record store", removed);
        Ok(removed as u64)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn migrate_schema(conn: &Connection) -> StoreResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version != SCHEMA_VERSION {
        if version != 0 {
            log::warn!(
                "Record store schema version {} does not match {}, rebuilding",
                version,
                SCHEMA_VERSION
            );
        }
        conn.execute_batch("DROP TABLE IF EXISTS files;")?;
    }

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS files (
             path          TEXT    NOT NULL PRIMARY KEY,
             length        INTEGER NOT NULL,
             last_modified INTEGER NOT NULL,
             content_hash  TEXT    NOT NULL,
             scan_time     INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_files_key ON files (content_hash, length);
         PRAGMA user_version = {SCHEMA_VERSION};"
    ))?;
    Ok(())
}

/// A row as stored, before the hash is decoded.
struct RawRecord {
    path: String,
    length: u64,
    last_modified: i64,
    content_hash: String,
    scan_time: i64,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            path: row.get(0)?,
            length: row.get(1)?,
            last_modified: row.get(2)?,
            content_hash: row.get(3)?,
            scan_time: row.get(4)?,
        })
    }

    fn into_record(self) -> StoreResult<FileRecord> {
        let Some(hash) = ContentHash::from_hex(&self.content_hash) else {
            return Err(StoreError::Decode {
                path: self.path,
                value: self.content_hash,
            });
        };
        Ok(FileRecord::new(
            self.path,
            self.length,
            self.last_modified,
            hash,
            self.scan_time,
        ))
    }
}

impl RecordStore for SqliteStore {
    fn upsert_batch(&self, records: &[FileRecord]) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO files (path, length, last_modified, content_hash, scan_time)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.path,
                    record.length,
                    record.last_modified,
                    record.content_hash.to_hex(),
                    record.scan_time,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, path: &str) -> StoreResult<Option<FileRecord>> {
        let conn = self.lock()?;
        let raw = conn
            .prepare_cached(&format!("{SELECT_COLUMNS} WHERE path = ?1"))?
            .query_row(params![path], RawRecord::from_row)
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
    }

    fn get_by_key(&self, hash: &ContentHash, length: u64) -> StoreResult<Vec<FileRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "{SELECT_COLUMNS} WHERE content_hash = ?1 AND length = ?2 ORDER BY path"
        ))?;
        let rows = stmt.query_map(params![hash.to_hex(), length], RawRecord::from_row)?;

        let mut records = Vec::new();
        for raw in rows {
            records.push(raw?.into_record()?);
        }
        Ok(records)
    }

    fn for_each_under_prefix(
        &self,
        prefix: &str,
        f: &mut dyn FnMut(FileRecord),
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "{SELECT_COLUMNS} WHERE substr(path, 1, length(?1)) = ?1 ORDER BY path"
        ))?;
        let mut rows = stmt.query(params![prefix])?;
        while let Some(row) = rows.next()? {
            f(RawRecord::from_row(row)?.into_record()?);
        }
        Ok(())
    }

    fn delete_stale_under_prefix(&self, prefix: &str, cutoff: i64) -> StoreResult<u64> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM files WHERE scan_time < ?1 AND substr(path, 1, length(?2)) = ?2",
            params![cutoff, prefix],
        )?;
        Ok(removed as u64)
    }

    fn latest_scan_time(&self) -> StoreResult<Option<i64>> {
        let conn = self.lock()?;
        let latest: Option<i64> =
            conn.query_row("SELECT MAX(scan_time) FROM files", [], |row| row.get(0))?;
        Ok(latest)
    }

    fn count(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// SQLite-backed record store for the catalog.
///
/// One database file per catalog. A single `entries` table keyed by path
/// holds every file and directory record; all four passes read and write
/// through this handle. WAL journal mode keeps each statement independently
/// durable, so a pass killed between two records leaves every committed
/// record intact.
///
/// Iteration is streaming or keyset-paginated — no query materializes the
/// whole table, so passes stay flat in memory on multi-million-entry
/// catalogs.
use crate::model::{system_time_nanos, FileEntry};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;
use tracing::warn;

/// Store-level failure. Fatal for the current pass; per-path filesystem
/// problems never surface here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store access failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// What `upsert` did with the record, so the indexer can report
/// inserted/updated counts and the caller knows a hash was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed for the path; one was created (hash absent).
    Inserted,
    /// Metadata changed; the record was refreshed and any hash cleared.
    Updated,
    /// The path changed kind (file ↔ directory). The old record was
    /// deleted and a fresh one inserted, keeping `is_directory` immutable
    /// per record.
    Replaced,
    /// Size and mtime matched the stored record; nothing was written.
    Unchanged,
}

/// Aggregate counts for the `stats` command.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreStats {
    pub total_records: u64,
    pub files: u64,
    pub directories: u64,
    pub files_hashed: u64,
    /// Sum of file sizes only — directory rows would double-count.
    pub total_file_size: u64,
}

const CREATE_TABLES_SQL: &str = "
    CREATE TABLE IF NOT EXISTS entries (
        path              TEXT PRIMARY KEY,
        parent_path       TEXT    NOT NULL,
        is_directory      INTEGER NOT NULL,
        modified_at       INTEGER NOT NULL,
        size              INTEGER,
        hash              TEXT,
        record_created_at INTEGER NOT NULL,
        updated_at        INTEGER NOT NULL,
        hashed_at         INTEGER
    ) WITHOUT ROWID;

    CREATE INDEX IF NOT EXISTS idx_entries_parent ON entries (parent_path);
    CREATE INDEX IF NOT EXISTS idx_entries_hash ON entries (hash);
";

/// Persistent table of `FileEntry` records keyed by path.
///
/// The handle owns one connection and is passed explicitly into each pass —
/// no ambient database state. Tests use [`FileStore::open_in_memory`].
pub struct FileStore {
    conn: Connection,
}

impl FileStore {
    /// Open (or create) a catalog database at `path`.
    ///
    /// Schema creation is idempotent, so every command can open the store
    /// the same way whether or not the file already exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a throwaway in-memory store. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -65536;",
        )?;
        conn.execute_batch(CREATE_TABLES_SQL)?;

        // Contract repair: a directory record must never carry a hash.
        // Should not occur in correct operation; corrected rather than
        // aborting if it ever does.
        let repaired = conn.execute(
            "UPDATE entries SET hash = NULL, hashed_at = NULL
             WHERE is_directory = 1 AND hash IS NOT NULL",
            [],
        )?;
        if repaired > 0 {
            warn!(repaired, "cleared hashes found on directory records");
        }

        Ok(Self { conn })
    }

    /// Insert or refresh the record for `entry.path`.
    ///
    /// Change detection: files compare `(size, modified_at)`, directories
    /// compare `modified_at` only — a directory's stored size is the
    /// aggregated total and must not be clobbered by a metadata refresh.
    /// Any metadata change on a file clears its hash, which is what
    /// schedules it for the next hash pass.
    pub fn upsert(&self, entry: &FileEntry) -> Result<UpsertOutcome> {
        let existing: Option<(bool, i64, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT is_directory, modified_at, size FROM entries WHERE path = ?1",
                params![entry.path],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let now = system_time_nanos(SystemTime::now());

        match existing {
            None => {
                self.insert(entry, now)?;
                Ok(UpsertOutcome::Inserted)
            }
            Some((was_directory, _, _)) if was_directory != entry.is_directory => {
                // Kind flip: delete-then-insert so `is_directory` stays
                // immutable for any single record's lifetime.
                self.conn
                    .execute("DELETE FROM entries WHERE path = ?1", params![entry.path])?;
                self.insert(entry, now)?;
                Ok(UpsertOutcome::Replaced)
            }
            Some((true, modified_at, _)) if modified_at == entry.modified_at => {
                Ok(UpsertOutcome::Unchanged)
            }
            Some((false, modified_at, size))
                if modified_at == entry.modified_at && size == entry.size.map(|s| s as i64) =>
            {
                Ok(UpsertOutcome::Unchanged)
            }
            Some((true, _, _)) => {
                self.conn.execute(
                    "UPDATE entries SET modified_at = ?2, updated_at = ?3 WHERE path = ?1",
                    params![entry.path, entry.modified_at, now],
                )?;
                Ok(UpsertOutcome::Updated)
            }
            Some((false, _, _)) => {
                self.conn.execute(
                    "UPDATE entries
                     SET modified_at = ?2, size = ?3, updated_at = ?4,
                         hash = NULL, hashed_at = NULL
                     WHERE path = ?1",
                    params![
                        entry.path,
                        entry.modified_at,
                        entry.size.map(|s| s as i64),
                        now
                    ],
                )?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    fn insert(&self, entry: &FileEntry, now: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO entries
                 (path, parent_path, is_directory, modified_at, size, hash,
                  record_created_at, updated_at, hashed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6, NULL)",
            params![
                entry.path,
                entry.parent_path,
                entry.is_directory,
                entry.modified_at,
                entry.size.map(|s| s as i64),
                now
            ],
        )?;
        Ok(())
    }

    /// Point lookup by path.
    pub fn get(&self, path: &str) -> Result<Option<FileEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT path, parent_path, is_directory, modified_at, size, hash
                 FROM entries WHERE path = ?1",
                params![path],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Delete the record for `path`. Returns `true` if a record existed.
    pub fn delete(&self, path: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM entries WHERE path = ?1", params![path])?;
        Ok(n > 0)
    }

    /// Whether a record exists for `path`.
    pub fn exists(&self, path: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM entries WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Stream every record in the subtree rooted at `root` (the root record
    /// itself included), in path order, to `f`.
    ///
    /// Path order has a property the aggregator relies on: a directory's
    /// row always precedes every row inside it, because the parent path is
    /// a strict prefix of each child path.
    pub fn for_each_under(&self, root: &str, mut f: impl FnMut(FileEntry)) -> Result<()> {
        let prefix = child_prefix(root);
        let mut stmt = self.conn.prepare(
            "SELECT path, parent_path, is_directory, modified_at, size, hash
             FROM entries
             WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2
             ORDER BY path",
        )?;
        let rows = stmt.query_map(params![root, prefix], row_to_entry)?;
        for row in rows {
            f(row?);
        }
        Ok(())
    }

    /// One keyset-paginated page of paths in the subtree rooted at `root`.
    ///
    /// Pass the last path of the previous page as `after` to continue.
    /// Keyset pagination (rather than OFFSET) stays correct while the
    /// caller deletes already-visited rows, which is exactly what the
    /// cleanup pass does.
    pub fn path_batch_under(
        &self,
        root: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>> {
        let prefix = child_prefix(root);
        let mut stmt = self.conn.prepare(
            "SELECT path FROM entries
             WHERE (path = ?1 OR substr(path, 1, length(?2)) = ?2) AND path > ?3
             ORDER BY path LIMIT ?4",
        )?;
        let rows = stmt.query_map(
            params![root, prefix, after.unwrap_or(""), limit as i64],
            |row| row.get(0),
        )?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(Into::into)
    }

    /// One page of file paths that still need a hash.
    ///
    /// A file is pending if its hash is absent, or empty, or computed
    /// before the file's current mtime. The indexer already clears stale
    /// hashes, so the `hashed_at < modified_at` arm is a second line of
    /// defense, not the primary mechanism.
    pub fn pending_hash_batch(&self, after: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT path FROM entries
             WHERE is_directory = 0
               AND (hash IS NULL OR hash = '' OR hashed_at < modified_at)
               AND path > ?1
             ORDER BY path LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![after.unwrap_or(""), limit as i64], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(Into::into)
    }

    /// Record a freshly computed content hash for a file.
    pub fn set_hash(&self, path: &str, hash: &str) -> Result<()> {
        let now = system_time_nanos(SystemTime::now());
        self.conn.execute(
            "UPDATE entries SET hash = ?2, hashed_at = ?3, updated_at = ?3
             WHERE path = ?1 AND is_directory = 0",
            params![path, hash, now],
        )?;
        Ok(())
    }

    /// Write an aggregated size for a directory record.
    pub fn set_directory_size(&self, path: &str, size: u64) -> Result<()> {
        let now = system_time_nanos(SystemTime::now());
        self.conn.execute(
            "UPDATE entries SET size = ?2, updated_at = ?3
             WHERE path = ?1 AND is_directory = 1",
            params![path, size as i64, now],
        )?;
        Ok(())
    }

    /// Aggregate counts over the whole store.
    pub fn stats(&self) -> Result<StoreStats> {
        self.conn
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(is_directory = 0), 0),
                        COALESCE(SUM(is_directory = 1), 0),
                        COALESCE(SUM(is_directory = 0 AND hash IS NOT NULL AND hash != ''), 0),
                        COALESCE(SUM(CASE WHEN is_directory = 0 THEN size ELSE 0 END), 0)
                 FROM entries",
                [],
                |row| {
                    Ok(StoreStats {
                        total_records: row.get::<_, i64>(0)? as u64,
                        files: row.get::<_, i64>(1)? as u64,
                        directories: row.get::<_, i64>(2)? as u64,
                        files_hashed: row.get::<_, i64>(3)? as u64,
                        total_file_size: row.get::<_, i64>(4)? as u64,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// Read access for the analysis queries in [`crate::analysis`].
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Prefix that matches exactly the strict descendants of `root`.
/// The filesystem root is its own child prefix ("/" prefixes everything).
fn child_prefix(root: &str) -> String {
    if root == "/" {
        root.to_string()
    } else {
        format!("{root}/")
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileEntry> {
    Ok(FileEntry {
        path: row.get(0)?,
        parent_path: row.get(1)?,
        is_directory: row.get(2)?,
        modified_at: row.get(3)?,
        size: row.get::<_, Option<i64>>(4)?.map(|s| s as u64),
        hash: row.get(5)?,
    })
}

/// Largest-N queries — the "what is eating this drive" view.
use crate::store::{FileStore, Result};
use rusqlite::params;
use serde::Serialize;

/// One row of a largest-N result.
#[derive(Debug, Clone, Serialize)]
pub struct LargestEntry {
    pub path: String,
    pub size: u64,
    /// Unix nanoseconds; for directories this is the directory's own
    /// mtime, not the newest mtime in the subtree.
    pub modified_at: i64,
}

/// The `n` largest individual files by stored size, descending.
pub fn largest_files(store: &FileStore, n: usize) -> Result<Vec<LargestEntry>> {
    largest(store, n, false)
}

/// The `n` largest directories by aggregated size, descending.
/// Directories without an aggregated size (no aggregate pass yet) are
/// excluded rather than reported as zero.
pub fn largest_directories(store: &FileStore, n: usize) -> Result<Vec<LargestEntry>> {
    largest(store, n, true)
}

fn largest(store: &FileStore, n: usize, directories: bool) -> Result<Vec<LargestEntry>> {
    let mut stmt = store.conn().prepare(
        "SELECT path, size, modified_at FROM entries
         WHERE is_directory = ?1 AND size IS NOT NULL
         ORDER BY size DESC, path
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![directories, n as i64], |row| {
        Ok(LargestEntry {
            path: row.get(0)?,
            size: row.get::<_, i64>(1)? as u64,
            modified_at: row.get(2)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileEntry;
    use std::path::Path;

    #[test]
    fn test_largest_files_ordering_and_limit() {
        let store = FileStore::open_in_memory().unwrap();
        for (path, size) in [("/r/a", 10), ("/r/b", 300), ("/r/c", 200)] {
            store
                .upsert(&FileEntry::new_file(Path::new(path), 1, size))
                .unwrap();
        }

        let top = largest_files(&store, 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!((top[0].path.as_str(), top[0].size), ("/r/b", 300));
        assert_eq!((top[1].path.as_str(), top[1].size), ("/r/c", 200));
    }

    #[test]
    fn test_unaggregated_directories_are_excluded() {
        let store = FileStore::open_in_memory().unwrap();
        store
            .upsert(&FileEntry::new_directory(Path::new("/r"), 1))
            .unwrap();
        assert!(largest_directories(&store, 10).unwrap().is_empty());

        store.set_directory_size("/r", 42).unwrap();
        let top = largest_directories(&store, 10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].size, 42);
    }
}

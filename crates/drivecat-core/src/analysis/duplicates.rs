/// Duplicate file detection by content digest.
///
/// Files were already hashed by the hash pass, so duplicate detection is a
/// pure query: group hashed files by digest and keep groups with more than
/// one member. Equal digests are treated as strong evidence of equal
/// content — sufficient for the duplicate-finding use case, not a
/// cryptographic proof.
use crate::store::{FileStore, Result};
use rusqlite::params;
use serde::Serialize;

/// A group of files sharing one content digest.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub hash: String,
    /// Size of each copy in bytes.
    pub size: u64,
    /// Paths of every copy, sorted.
    pub paths: Vec<String>,
}

impl DuplicateGroup {
    /// Bytes that deleting all but one copy would reclaim. Zero for a
    /// group holding fewer than two paths.
    pub fn wasted_bytes(&self) -> u64 {
        self.size * self.paths.len().saturating_sub(1) as u64
    }
}

/// Find up to `limit` duplicate groups, ordered by reclaimable bytes
/// descending — the groups worth acting on first.
///
/// Unhashed files are invisible here; run a hash pass first for complete
/// results.
pub fn duplicate_groups(store: &FileStore, limit: usize) -> Result<Vec<DuplicateGroup>> {
    let conn = store.conn();
    let mut stmt = conn.prepare(
        "SELECT hash, MAX(size), COUNT(*) AS copies
         FROM entries
         WHERE is_directory = 0 AND hash IS NOT NULL AND hash != ''
         GROUP BY hash
         HAVING COUNT(*) > 1
         ORDER BY MAX(size) * (COUNT(*) - 1) DESC
         LIMIT ?1",
    )?;
    let groups = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<i64>>(1)?.unwrap_or(0) as u64,
            ))
        })?
        .collect::<rusqlite::Result<Vec<(String, u64)>>>()?;

    let mut path_stmt =
        conn.prepare("SELECT path FROM entries WHERE hash = ?1 ORDER BY path")?;
    let mut out = Vec::with_capacity(groups.len());
    for (hash, size) in groups {
        let paths = path_stmt
            .query_map(params![hash], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        out.push(DuplicateGroup { hash, size, paths });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileEntry;
    use std::path::Path;

    fn seed_file(store: &FileStore, path: &str, size: u64, hash: Option<&str>) {
        store
            .upsert(&FileEntry::new_file(Path::new(path), 1, size))
            .unwrap();
        if let Some(h) = hash {
            store.set_hash(path, h).unwrap();
        }
    }

    #[test]
    fn test_groups_by_hash_and_orders_by_waste() {
        let store = FileStore::open_in_memory().unwrap();
        // Two copies of a big file, three of a small one, one unique.
        seed_file(&store, "/r/big1", 1000, Some("aaaa"));
        seed_file(&store, "/r/big2", 1000, Some("aaaa"));
        seed_file(&store, "/r/small1", 10, Some("bbbb"));
        seed_file(&store, "/r/small2", 10, Some("bbbb"));
        seed_file(&store, "/r/small3", 10, Some("bbbb"));
        seed_file(&store, "/r/unique", 5000, Some("cccc"));
        seed_file(&store, "/r/unhashed", 9999, None);

        let groups = duplicate_groups(&store, 10).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].hash, "aaaa");
        assert_eq!(groups[0].paths.len(), 2);
        assert_eq!(groups[0].wasted_bytes(), 1000);
        assert_eq!(groups[1].hash, "bbbb");
        assert_eq!(groups[1].wasted_bytes(), 20);
    }

    #[test]
    fn test_wasted_bytes_never_underflows() {
        let group = DuplicateGroup {
            hash: "aaaa".into(),
            size: 100,
            paths: Vec::new(),
        };
        assert_eq!(group.wasted_bytes(), 0);
        let single = DuplicateGroup {
            hash: "aaaa".into(),
            size: 100,
            paths: vec!["/r/a".into()],
        };
        assert_eq!(single.wasted_bytes(), 0);
    }

    #[test]
    fn test_no_duplicates_yields_empty() {
        let store = FileStore::open_in_memory().unwrap();
        seed_file(&store, "/r/a", 1, Some("aaaa"));
        seed_file(&store, "/r/b", 1, Some("bbbb"));
        assert!(duplicate_groups(&store, 10).unwrap().is_empty());
    }
}

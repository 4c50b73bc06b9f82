/// Cleanup pass — remove records whose filesystem path no longer exists.
///
/// Sweeps the stored subtree in keyset-paginated pages and stats each path
/// individually. Every record's fate is decided only by its own existence
/// check: a deleted directory's descendants are each checked and removed on
/// their own, with no inference from a missing parent.
///
/// A stat failure that is not NotFound (permission denied, I/O error)
/// proves nothing about absence, so the record is kept and counted as a
/// skip rather than deleted.
use crate::model::normalize_root;
use crate::passes::PassSummary;
use crate::store::{FileStore, Result};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Stored paths fetched per page.
const BATCH_SIZE: usize = 500;

/// Run one cleanup pass over the stored subtree at `root`.
pub fn cleanup(store: &FileStore, root: &Path) -> Result<PassSummary> {
    let root_key = normalize_root(root).to_string_lossy().into_owned();
    let mut summary = PassSummary::default();
    let mut after: Option<String> = None;

    loop {
        let batch = store.path_batch_under(&root_key, after.as_deref(), BATCH_SIZE)?;
        if batch.is_empty() {
            break;
        }
        after = batch.last().cloned();

        for path in batch {
            summary.processed += 1;
            match std::fs::symlink_metadata(&path) {
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    if store.delete(&path)? {
                        summary.changed += 1;
                    }
                }
                Err(err) => {
                    warn!(%path, %err, "cannot prove path missing; keeping record");
                    summary.skipped += 1;
                }
            }
        }
    }

    info!(
        root = %root_key,
        checked = summary.processed,
        removed = summary.changed,
        skipped = summary.skipped,
        "cleanup pass complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::index;
    use crate::store::FileStore;
    use std::fs;

    #[test]
    fn test_clean_tree_removes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"x").unwrap();
        let store = FileStore::open_in_memory().unwrap();
        index(&store, tmp.path()).unwrap();

        let summary = cleanup(&store, tmp.path()).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.changed, 0);
        assert_eq!(summary.skipped, 0);
    }

    /// A stat failure that is not NotFound proves nothing about absence:
    /// the records must survive and be counted as skips, not deletions.
    #[cfg(unix)]
    #[test]
    fn test_unstattable_paths_are_kept_not_deleted() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/b.txt"), b"x").unwrap();
        fs::write(tmp.path().join("sub/c.txt"), b"y").unwrap();
        let store = FileStore::open_in_memory().unwrap();
        index(&store, tmp.path()).unwrap();

        let sub = tmp.path().join("sub");
        fs::set_permissions(&sub, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::symlink_metadata(sub.join("b.txt")).is_ok() {
            // Running as root: permission bits don't apply, nothing to test.
            fs::set_permissions(&sub, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let summary = cleanup(&store, tmp.path()).unwrap();
        fs::set_permissions(&sub, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.changed, 0, "nothing was actually deleted");
        assert_eq!(summary.skipped, 2, "the two unstattable files");
        let key = |p: &str| sub.join(p).to_string_lossy().into_owned();
        assert!(store.exists(&key("b.txt")).unwrap());
        assert!(store.exists(&key("c.txt")).unwrap());
    }
}

/// Aggregate pass — recompute recursive directory sizes, bottom-up.
///
/// Directory nodes live in a flat arena built while streaming the subtree's
/// rows in path order. Path order guarantees a parent directory's row
/// arrives before any row inside it, so parents always sit at lower arena
/// indices than their children — which makes a single *reverse* iteration
/// over the arena a complete bottom-up roll-up: every directory's total is
/// final before its parent reads it. No recursion, no call-stack depth
/// limit, O(directories) memory.
///
/// File sizes are added to their parent during the streaming phase, so the
/// arena never holds file nodes at all. A directory with no children ends
/// at size 0.
use crate::model::normalize_root;
use crate::passes::PassSummary;
use crate::store::{FileStore, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// One directory in the aggregation arena.
struct DirNode {
    path: String,
    /// Arena index of the parent directory. `None` for the subtree root
    /// (its parent lies outside the swept range).
    parent: Option<usize>,
    /// Running total: direct-child file bytes during streaming, full
    /// recursive bytes after the reverse pass.
    size: u64,
    /// Size currently in the store, to skip no-op writes.
    stored_size: Option<u64>,
}

/// Run one aggregate pass over the stored subtree at `root`.
///
/// Interrupting mid-write leaves some directories with stale sizes; the
/// next pass recomputes and repairs them.
pub fn aggregate(store: &FileStore, root: &Path) -> Result<PassSummary> {
    let root_key = normalize_root(root).to_string_lossy().into_owned();
    let mut summary = PassSummary::default();

    let mut nodes: Vec<DirNode> = Vec::new();
    let mut index_by_path: HashMap<String, usize> = HashMap::new();

    store.for_each_under(&root_key, |entry| {
        if entry.is_directory {
            let parent = index_by_path.get(&entry.parent_path).copied();
            index_by_path.insert(entry.path.clone(), nodes.len());
            nodes.push(DirNode {
                path: entry.path,
                parent,
                size: 0,
                stored_size: entry.size,
            });
        } else {
            match index_by_path.get(&entry.parent_path) {
                Some(&parent) => nodes[parent].size += entry.size.unwrap_or(0),
                None => {
                    // A file row with no stored parent directory: either
                    // the subtree was never indexed from this root, or the
                    // store lost the directory record. Not attributable.
                    warn!(path = %entry.path, "file has no stored parent directory");
                    summary.skipped += 1;
                }
            }
        }
    })?;

    // Reverse pass: children before parents.
    for i in (0..nodes.len()).rev() {
        if let Some(parent) = nodes[i].parent {
            let subtotal = nodes[i].size;
            nodes[parent].size += subtotal;
        }
    }

    for node in &nodes {
        summary.processed += 1;
        if node.stored_size == Some(node.size) {
            continue;
        }
        store.set_directory_size(&node.path, node.size)?;
        summary.changed += 1;
    }

    info!(
        root = %root_key,
        directories = summary.processed,
        updated = summary.changed,
        orphaned = summary.skipped,
        "aggregate pass complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileEntry;
    use crate::store::FileStore;

    fn seed(store: &FileStore, path: &str, size: Option<u64>, is_dir: bool) {
        let entry = if is_dir {
            FileEntry::new_directory(Path::new(path), 1)
        } else {
            FileEntry::new_file(Path::new(path), 1, size.unwrap_or(0))
        };
        store.upsert(&entry).unwrap();
    }

    #[test]
    fn test_recursive_sizes_roll_up() {
        let store = FileStore::open_in_memory().unwrap();
        seed(&store, "/r", None, true);
        seed(&store, "/r/a.txt", Some(10), false);
        seed(&store, "/r/sub", None, true);
        seed(&store, "/r/sub/b.txt", Some(5), false);
        seed(&store, "/r/sub/c.txt", Some(7), false);

        let summary = aggregate(&store, Path::new("/r")).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.changed, 2);

        assert_eq!(store.get("/r/sub").unwrap().unwrap().size, Some(12));
        assert_eq!(store.get("/r").unwrap().unwrap().size, Some(22));
    }

    #[test]
    fn test_empty_directory_gets_zero() {
        let store = FileStore::open_in_memory().unwrap();
        seed(&store, "/r", None, true);
        seed(&store, "/r/empty", None, true);

        aggregate(&store, Path::new("/r")).unwrap();
        assert_eq!(store.get("/r/empty").unwrap().unwrap().size, Some(0));
        assert_eq!(store.get("/r").unwrap().unwrap().size, Some(0));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let store = FileStore::open_in_memory().unwrap();
        seed(&store, "/r", None, true);
        seed(&store, "/r/a", Some(100), false);

        aggregate(&store, Path::new("/r")).unwrap();
        let second = aggregate(&store, Path::new("/r")).unwrap();
        assert_eq!(second.processed, 1);
        assert_eq!(second.changed, 0);
    }
}

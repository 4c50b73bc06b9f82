/// Lazy filesystem traversal using `jwalk`'s parallel walker.
///
/// `walk` yields a forward-only stream of events: one `Entry` per reachable
/// file or directory (the root itself included), and one `Inaccessible` per
/// path that could not be read. Unreadable paths never abort the walk —
/// soft failures are part of the event stream so the caller can count them.
///
/// jwalk keeps an internal queue of pending directories rather than
/// recursing, so arbitrarily deep trees cannot overflow the stack, and
/// entries are produced on demand rather than materialized up front.
use crate::model::system_time_nanos;
use std::path::{Path, PathBuf};

/// One observed filesystem entry, tagged with the metadata the indexer
/// reconciles against the store.
#[derive(Debug, Clone)]
pub struct WalkedEntry {
    pub path: PathBuf,
    pub is_directory: bool,
    /// Unix nanoseconds.
    pub modified_at: i64,
    /// `Some` for files, `None` for directories (directory sizes come
    /// from the aggregate pass, not from stat).
    pub size: Option<u64>,
}

/// A single step of the walk: a readable entry, or a path that failed to
/// stat (permission denied, vanished mid-walk, broken mount).
#[derive(Debug)]
pub enum WalkEvent {
    Entry(WalkedEntry),
    Inaccessible { path: PathBuf, message: String },
}

/// Walk the tree under `root`, depth-first per directory, producing events
/// lazily. Restartable: holds no state beyond the iterator itself.
///
/// Symlinks are not followed; a symlink is recorded as a file with its own
/// (link) metadata, matching what `stat`-without-follow reports.
pub fn walk(root: &Path) -> impl Iterator<Item = WalkEvent> {
    jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
        .into_iter()
        .map(|entry_result| match entry_result {
            Ok(entry) => event_for(&entry),
            Err(err) => WalkEvent::Inaccessible {
                path: err.path().map(Path::to_path_buf).unwrap_or_default(),
                message: err.to_string(),
            },
        })
}

/// Stat one walked entry into a `WalkEvent`, downgrading any metadata
/// failure to `Inaccessible`.
fn event_for(entry: &jwalk::DirEntry<((), ())>) -> WalkEvent {
    let path = entry.path();
    let is_directory = entry.file_type().is_dir();

    let meta = match std::fs::symlink_metadata(&path) {
        Ok(meta) => meta,
        Err(err) => {
            return WalkEvent::Inaccessible {
                path,
                message: err.to_string(),
            }
        }
    };

    let modified_at = match meta.modified() {
        Ok(time) => system_time_nanos(time),
        Err(err) => {
            return WalkEvent::Inaccessible {
                path,
                message: err.to_string(),
            }
        }
    };

    WalkEvent::Entry(WalkedEntry {
        size: if is_directory { None } else { Some(meta.len()) },
        path,
        is_directory,
        modified_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_walk_emits_root_dirs_and_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
        fs::write(tmp.path().join("sub/b.txt"), b"world!").unwrap();

        let mut dirs = 0;
        let mut files = 0;
        let mut total = 0u64;
        for event in walk(tmp.path()) {
            match event {
                WalkEvent::Entry(e) if e.is_directory => {
                    assert!(e.size.is_none());
                    dirs += 1;
                }
                WalkEvent::Entry(e) => {
                    total += e.size.unwrap_or(0);
                    files += 1;
                }
                WalkEvent::Inaccessible { path, message } => {
                    panic!("unexpected soft failure for {}: {message}", path.display())
                }
            }
        }

        // Root + sub, two files, 5 + 6 bytes.
        assert_eq!(dirs, 2);
        assert_eq!(files, 2);
        assert_eq!(total, 11);
    }

    /// A directory that can be listed but not traversed (read bit without
    /// execute) makes every child unstattable. The walk must keep going
    /// and report each such child as one `Inaccessible` event.
    #[cfg(unix)]
    #[test]
    fn test_unreadable_children_are_soft_failures() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"fine").unwrap();
        fs::create_dir(tmp.path().join("locked")).unwrap();
        fs::write(tmp.path().join("locked/hidden.txt"), b"x").unwrap();

        let locked = tmp.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        if fs::symlink_metadata(locked.join("hidden.txt")).is_ok() {
            // Running as root: permission bits don't apply, nothing to test.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut entries = 0;
        let mut inaccessible = 0;
        for event in walk(tmp.path()) {
            match event {
                WalkEvent::Entry(_) => entries += 1,
                WalkEvent::Inaccessible { .. } => inaccessible += 1,
            }
        }
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Root, a.txt, and the locked directory itself are readable.
        assert_eq!(entries, 3);
        assert_eq!(inaccessible, 1, "one event per unstattable child");
    }

    #[test]
    fn test_walk_is_restartable() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("a"), b"x").unwrap();

        let first: usize = walk(tmp.path()).count();
        let second: usize = walk(tmp.path()).count();
        assert_eq!(first, second);
    }
}

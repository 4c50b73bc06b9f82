/// A single file or directory record in the catalog.
///
/// Entries are keyed by their absolute path string. The record mirrors the
/// filesystem's metadata as last observed by an index pass; it may lag the
/// real filesystem until the next pass runs.
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One row of the `entries` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Absolute path — the primary key. Stored as a lossy UTF-8 string:
    /// a path whose name is not valid UTF-8 gets replacement characters
    /// and the resulting key never resolves back to the real file, so
    /// such entries churn between passes (cleanup removes, index
    /// re-inserts) instead of being tracked.
    pub path: String,

    /// Path of the containing directory. Empty for the filesystem root.
    /// Stored (not derived per query) so children can be grouped cheaply.
    pub parent_path: String,

    /// `true` for directories. Immutable for the lifetime of a record:
    /// a path that changes kind is deleted and re-inserted.
    pub is_directory: bool,

    /// Last-modified time as observed on the filesystem, in unix
    /// nanoseconds. Change detection compares this for exact equality,
    /// so sub-second mtime precision is preserved.
    pub modified_at: i64,

    /// Size in bytes. Files: the stat size, always present.
    /// Directories: the aggregated size of all descendants, `None` until
    /// an aggregate pass has computed it.
    pub size: Option<u64>,

    /// BLAKE3 digest of the file content as lowercase hex.
    /// `None` until a hash pass computes it, and cleared again whenever
    /// an index pass sees the size or mtime change. Always `None` for
    /// directories.
    pub hash: Option<String>,
}

impl FileEntry {
    /// Build a file record from walked metadata. The hash starts absent,
    /// which is what schedules the file for the next hash pass.
    pub fn new_file(path: &Path, modified_at: i64, size: u64) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            parent_path: parent_of(path),
            is_directory: false,
            modified_at,
            size: Some(size),
            hash: None,
        }
    }

    /// Build a directory record. Size stays absent until aggregation.
    pub fn new_directory(path: &Path, modified_at: i64) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            parent_path: parent_of(path),
            is_directory: true,
            modified_at,
            size: None,
            hash: None,
        }
    }
}

/// Containing-directory string for a path. Empty for the filesystem root.
pub fn parent_of(path: &Path) -> String {
    path.parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Convert a `SystemTime` to unix nanoseconds, saturating at the i64 range.
///
/// Pre-epoch mtimes (seen on damaged filesystems) become negative rather
/// than failing the walk.
pub fn system_time_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos())
            .map(|n| -n)
            .unwrap_or(i64::MIN),
    }
}

/// Canonical root key for subtree queries: the path string without a
/// trailing separator (except the filesystem root itself). All passes over
/// a subtree normalize the root the same way so their key ranges agree.
pub fn normalize_root(root: &Path) -> PathBuf {
    let s = root.to_string_lossy();
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of(Path::new("/a/b/c.txt")), "/a/b");
        assert_eq!(parent_of(Path::new("/a")), "/");
        assert_eq!(parent_of(Path::new("/")), "");
    }

    #[test]
    fn test_system_time_nanos_round_trip() {
        let t = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        assert_eq!(system_time_nanos(t), 1_700_000_000_123_456_789);
    }

    #[test]
    fn test_system_time_nanos_pre_epoch() {
        let t = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(system_time_nanos(t), -10_000_000_000);
    }

    #[test]
    fn test_normalize_root_strips_trailing_separator() {
        assert_eq!(normalize_root(Path::new("/mnt/drive/")), PathBuf::from("/mnt/drive"));
        assert_eq!(normalize_root(Path::new("/mnt/drive")), PathBuf::from("/mnt/drive"));
        assert_eq!(normalize_root(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn test_new_file_has_no_hash() {
        let entry = FileEntry::new_file(Path::new("/tmp/a.bin"), 42, 100);
        assert_eq!(entry.parent_path, "/tmp");
        assert!(!entry.is_directory);
        assert_eq!(entry.size, Some(100));
        assert!(entry.hash.is_none());
    }
}

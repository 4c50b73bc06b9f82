/// Index pass — reconcile a filesystem subtree into the store.
///
/// Walks `root` and upserts every reachable entry: new paths are inserted
/// (files with no hash, which schedules them for hashing), changed paths
/// are refreshed with their hash invalidated, unchanged paths are left
/// untouched. Nothing is ever deleted here; that is the cleanup pass's job.
use crate::model::{normalize_root, FileEntry};
use crate::passes::PassSummary;
use crate::store::{FileStore, Result, UpsertOutcome};
use crate::walker::{walk, WalkEvent};
use std::path::Path;
use tracing::{info, warn};

/// Run one index pass over the subtree at `root`.
pub fn index(store: &FileStore, root: &Path) -> Result<PassSummary> {
    let root = normalize_root(root);
    let mut summary = PassSummary::default();
    let (mut inserted, mut updated, mut replaced, mut unchanged) = (0u64, 0u64, 0u64, 0u64);

    for event in walk(&root) {
        let walked = match event {
            WalkEvent::Entry(walked) => walked,
            WalkEvent::Inaccessible { path, message } => {
                warn!(path = %path.display(), %message, "skipping unreadable path");
                summary.skipped += 1;
                continue;
            }
        };

        summary.processed += 1;
        let entry = if walked.is_directory {
            FileEntry::new_directory(&walked.path, walked.modified_at)
        } else {
            FileEntry::new_file(&walked.path, walked.modified_at, walked.size.unwrap_or(0))
        };

        match store.upsert(&entry)? {
            UpsertOutcome::Inserted => {
                inserted += 1;
                summary.changed += 1;
            }
            UpsertOutcome::Updated => {
                updated += 1;
                summary.changed += 1;
            }
            UpsertOutcome::Replaced => {
                replaced += 1;
                summary.changed += 1;
            }
            UpsertOutcome::Unchanged => unchanged += 1,
        }
    }

    info!(
        root = %root.display(),
        inserted,
        updated,
        replaced,
        unchanged,
        skipped = summary.skipped,
        "index pass complete"
    );
    Ok(summary)
}

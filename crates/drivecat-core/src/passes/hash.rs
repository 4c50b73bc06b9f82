/// Hash pass — compute BLAKE3 digests for files that need one.
///
/// Hashing is the dominant I/O cost of the whole system, and files are
/// independent of each other, so this is the one pass with internal
/// parallelism: pending paths are pulled from the store a batch at a time
/// and fanned out to a pool of worker threads over bounded crossbeam
/// channels. All store writes stay on the calling thread — workers only
/// read file content — so the single connection is never shared.
///
/// A file that vanishes or turns unreadable between selection and read is
/// skipped and stays hashless; the next pass will select it again.
use crate::passes::PassSummary;
use crate::store::{FileStore, Result};
use std::io::Read;
use std::path::Path;
use std::thread;
use tracing::{debug, info, warn};

/// Pending files fetched (and results written) per round trip to the store.
const BATCH_SIZE: usize = 500;

/// Bytes read per chunk while digesting a file.
const READ_CHUNK: usize = 1 << 20;

/// Cap on hashing threads. Past this point the drive, not the CPU, is the
/// bottleneck — more readers just make the access pattern more random.
const MAX_WORKERS: usize = 8;

struct HashOutcome {
    path: String,
    digest: std::io::Result<String>,
}

/// Run one hash pass: digest every file whose hash is absent or stale.
pub fn hash(store: &FileStore) -> Result<PassSummary> {
    let workers = num_cpus::get().clamp(1, MAX_WORKERS);
    let mut summary = PassSummary::default();
    let mut after: Option<String> = None;

    loop {
        let batch = store.pending_hash_batch(after.as_deref(), BATCH_SIZE)?;
        if batch.is_empty() {
            break;
        }
        // Keyset cursor: files that fail stay hashless but are behind the
        // cursor, so a single pass visits each pending file exactly once.
        after = batch.last().cloned();
        debug!(batch = batch.len(), workers, "hashing batch");

        for outcome in hash_batch(batch, workers) {
            summary.processed += 1;
            match outcome.digest {
                Ok(digest) => {
                    store.set_hash(&outcome.path, &digest)?;
                    summary.changed += 1;
                }
                Err(err) => {
                    warn!(path = %outcome.path, %err, "skipping unreadable file");
                    summary.skipped += 1;
                }
            }
        }
    }

    info!(
        hashed = summary.changed,
        skipped = summary.skipped,
        "hash pass complete"
    );
    Ok(summary)
}

/// Digest one batch of paths on `workers` threads, collecting an outcome
/// per path in completion order.
fn hash_batch(paths: Vec<String>, workers: usize) -> Vec<HashOutcome> {
    let expected = paths.len();
    let (work_tx, work_rx) = crossbeam_channel::bounded::<String>(expected);
    let (result_tx, result_rx) = crossbeam_channel::bounded::<HashOutcome>(expected);

    for path in paths {
        // Capacity equals the batch length, so this never blocks.
        let _ = work_tx.send(path);
    }
    drop(work_tx);

    thread::scope(|scope| {
        for i in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            thread::Builder::new()
                .name(format!("drivecat-hasher-{i}"))
                .spawn_scoped(scope, move || {
                    for path in work_rx {
                        let digest = digest_file(Path::new(&path));
                        let _ = result_tx.send(HashOutcome { path, digest });
                    }
                })
                .expect("failed to spawn hasher thread");
        }
        drop(result_tx);

        result_rx.iter().collect()
    })
}

/// BLAKE3 digest of a file's content as lowercase hex, read in 1 MiB
/// chunks so memory stays flat regardless of file size.
fn digest_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

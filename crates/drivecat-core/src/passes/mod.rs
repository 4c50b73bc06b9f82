/// Pass entry points — the four independently restartable operations over
/// a store: index, hash, cleanup, aggregate.
///
/// Each pass takes the store handle explicitly, traverses once, and returns
/// a [`PassSummary`]. Success is the `Ok` arm of the result; only a store
/// failure is an error. Per-path problems are logged, counted as skips, and
/// never abort a pass.
pub mod aggregate;
pub mod cleanup;
pub mod hash;
pub mod index;

pub use aggregate::aggregate;
pub use cleanup::cleanup;
pub use hash::hash;
pub use index::index;

use serde::Serialize;

/// Counts reported by every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Items examined: walked entries, pending files, stored paths, or
    /// directories, depending on the pass.
    pub processed: u64,
    /// Records actually written or removed.
    pub changed: u64,
    /// Soft per-path failures (and, for aggregate, rows with no stored
    /// parent directory). Counted once each, never raised.
    pub skipped: u64,
}

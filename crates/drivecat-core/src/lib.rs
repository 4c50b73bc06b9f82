/// drivecat-core — indexing and aggregation engine for offline drive catalogs.
///
/// This crate contains all engine logic with no CLI dependencies. The
/// durable artifact is a single SQLite table of file/directory records,
/// maintained by four independently restartable passes over the same
/// store: index, hash, cleanup, aggregate. Any pass can run at any time,
/// in any order, in any process; each record mutation commits on its own,
/// so an interrupted pass never corrupts what earlier passes wrote.
///
/// # Modules
///
/// - [`model`] — The `FileEntry` record type and display formatting.
/// - [`store`] — SQLite-backed record store keyed by path.
/// - [`walker`] — Lazy parallel filesystem traversal with soft failures.
/// - [`passes`] — The four pass entry points and their shared summary type.
/// - [`analysis`] — Read-only queries: duplicates, largest files/directories.
pub mod analysis;
pub mod model;
pub mod passes;
pub mod store;
pub mod walker;

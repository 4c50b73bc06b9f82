/// Data model for the drivecat catalog.
///
/// Re-exports the entry record type and display formatting helpers.
pub mod entry;
pub mod size;

pub use entry::{normalize_root, parent_of, system_time_nanos, FileEntry};
pub use size::{format_mtime, format_size};

/// Analysis queries — read-only insights over a populated catalog.
///
/// These consume the stored data model; they add no engine logic and can
/// run at any time, even between passes (results reflect whatever the
/// store currently holds).
pub mod duplicates;
pub mod top;

pub use duplicates::{duplicate_groups, DuplicateGroup};
pub use top::{largest_directories, largest_files, LargestEntry};

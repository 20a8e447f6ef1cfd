/// Data model for a backup folder: a sorted, point-in-time listing of its
/// files, plus display helpers for sizes and counts.
pub mod size;
pub mod snapshot;

pub use size::{format_count, format_size};
pub use snapshot::{Entry, Snapshot};

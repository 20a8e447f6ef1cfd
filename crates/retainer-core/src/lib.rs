/// Retainer Core: snapshot, retention planning, pruning, and backup invocation.
///
/// This crate contains all business logic with zero CLI dependencies.
/// The `retainer` binary is a thin wrapper that parses arguments, sets up
/// logging, and maps a [`report::RunReport`] to an exit code.
///
/// # Modules
///
/// - [`model`]: Sorted directory snapshots and size formatting.
/// - [`retention`]: Retention policy, deletion planning, and the pruner loop.
/// - [`backup`]: Synchronous invocation of the external backup tool.
/// - [`report`]: Aggregated, serialisable result of one run.
/// - [`runner`]: Prune-then-backup orchestration for one invocation.
/// - [`error`]: Error type shared by all of the above.
pub mod backup;
pub mod error;
pub mod model;
pub mod report;
pub mod retention;
pub mod runner;

pub use error::RetainError;

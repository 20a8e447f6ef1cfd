/// Retention policy and deletion planning.
///
/// Everything in this module is pure: it decides *which* files go, given a
/// snapshot. The I/O loop that actually removes them lives in [`pruner`].
pub mod pruner;

pub use pruner::{plan, prune, remove_oldest, DeletedEntry, PruneFailure, PruneReport, Removal};

use crate::model::{Entry, Snapshot};
use serde::Serialize;

/// How many backup files may remain in a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    /// Retention threshold as given by the user. Not validated: zero and
    /// negative values both mean "keep nothing".
    pub max_files: i64,
    /// Keep one file fewer than `max_files`, so the backup written right
    /// after pruning brings the folder back up to exactly `max_files`.
    pub reserve_slot: bool,
}

impl RetentionPolicy {
    pub fn new(max_files: i64) -> Self {
        Self {
            max_files,
            reserve_slot: false,
        }
    }

    pub fn with_reserve_slot(mut self, reserve_slot: bool) -> Self {
        self.reserve_slot = reserve_slot;
        self
    }

    /// Number of files allowed to survive pruning. Never negative.
    pub fn keep_count(&self) -> usize {
        let keep = self.max_files.max(0) as u64;
        let keep = if self.reserve_slot {
            keep.saturating_sub(1)
        } else {
            keep
        };
        usize::try_from(keep).unwrap_or(usize::MAX)
    }

    /// How many of `count` files must be deleted to satisfy the policy.
    pub fn excess(&self, count: usize) -> usize {
        count.saturating_sub(self.keep_count())
    }
}

/// The files a single pass would delete, oldest first.
///
/// This is the prefix of the sorted snapshot whose length is the policy's
/// excess, so the result is deterministic for a given listing.
pub fn plan_deletions<'a>(snapshot: &'a Snapshot, policy: &RetentionPolicy) -> &'a [Entry] {
    let excess = policy.excess(snapshot.len());
    &snapshot.entries()[..excess]
}

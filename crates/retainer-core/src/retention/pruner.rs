/// The retention pruner: deletes the oldest file in a folder, re-lists, and
/// repeats until the folder satisfies its [`RetentionPolicy`].
///
/// # Re-listing
///
/// The folder is read again after every deletion instead of walking a single
/// snapshot. Backup folders hold a handful of files, so the extra syscalls
/// are negligible, and each step always acts on what is actually on disk.
///
/// # Concurrent writers
///
/// Listing and removal are not atomic. A file that disappears in between is
/// skipped with a warning. A file created in between may itself be deleted
/// if it sorts first.
use super::{plan_deletions, RetentionPolicy};
use crate::error::RetainError;
use crate::model::{Entry, Snapshot};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One file removed (or, in a dry run, selected for removal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedEntry {
    /// File name, lossily converted for display.
    pub name: String,
    #[serde(serialize_with = "lossy_path::serialize")]
    pub path: PathBuf,
    pub size: u64,
}

impl From<&Entry> for DeletedEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.to_string_lossy().into_owned(),
            path: entry.path.clone(),
            size: entry.size,
        }
    }
}

/// Outcome of pruning one folder.
#[derive(Debug, Clone, Serialize)]
pub struct PruneReport {
    #[serde(serialize_with = "lossy_path::serialize")]
    pub dir: PathBuf,
    pub policy: RetentionPolicy,
    /// `true` when nothing was actually deleted.
    pub dry_run: bool,
    /// Deleted files in deletion order (oldest first).
    pub deleted: Vec<DeletedEntry>,
    /// Files left in the folder after the last step.
    pub remaining: usize,
    /// Sum of `deleted[..].size`.
    pub bytes_reclaimed: u64,
}

impl PruneReport {
    fn new(dir: &Path, policy: RetentionPolicy, dry_run: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            policy,
            dry_run,
            deleted: Vec::new(),
            remaining: 0,
            bytes_reclaimed: 0,
        }
    }

    fn push(&mut self, entry: &Entry) {
        self.bytes_reclaimed = self.bytes_reclaimed.saturating_add(entry.size);
        self.deleted.push(DeletedEntry::from(entry));
    }

    /// Names of the deleted files, in deletion order.
    pub fn deleted_names(&self) -> Vec<&str> {
        self.deleted.iter().map(|d| d.name.as_str()).collect()
    }
}

/// Serialise a path even when it is not valid UTF-8. Backup names come from
/// whatever wrote them, and a report must never fail on one.
mod lossy_path {
    use serde::Serializer;
    use std::path::Path;

    pub fn serialize<S: Serializer>(path: &Path, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&path.to_string_lossy())
    }
}

/// Pruning stopped part-way. `report` holds what was already deleted;
/// those deletions are not rolled back.
#[derive(Debug, Error)]
#[error("pruning {} stopped after {} deletion(s)", .report.dir.display(), .report.deleted.len())]
pub struct PruneFailure {
    pub report: PruneReport,
    #[source]
    pub error: RetainError,
}

/// Delete the oldest files in `dir` until `policy` is satisfied.
///
/// Terminates on an empty folder regardless of the threshold, so a zero or
/// negative `max_files` empties the folder and stops.
pub fn prune(dir: &Path, policy: &RetentionPolicy) -> Result<PruneReport, PruneFailure> {
    let mut report = PruneReport::new(dir, *policy, false);
    let keep = policy.keep_count();
    debug!("Pruning {} down to {} file(s)", dir.display(), keep);

    // Name of the last file that vanished before we could remove it. Seeing
    // the same name vanish twice means the listing and the filesystem
    // disagree, and retrying would spin forever.
    let mut last_vanished: Option<OsString> = None;

    loop {
        let snapshot = match Snapshot::read(dir) {
            Ok(s) => s,
            Err(error) => return Err(PruneFailure { report, error }),
        };
        report.remaining = snapshot.len();

        if policy.excess(snapshot.len()) == 0 {
            break;
        }
        let Some(oldest) = snapshot.first() else {
            break;
        };

        match remove_oldest(oldest, &mut last_vanished) {
            Ok(Removal::Removed) => {
                report.push(oldest);
                report.remaining = snapshot.len() - 1;
            }
            Ok(Removal::Vanished) => {}
            Err(error) => return Err(PruneFailure { report, error }),
        }
    }

    info!(
        "Pruned {}: removed {}, {} remaining",
        dir.display(),
        report.deleted.len(),
        report.remaining
    );
    Ok(report)
}

/// What happened to the file [`remove_oldest`] was asked to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Already gone when we tried; the caller should re-list.
    Vanished,
}

/// Remove one entry, tolerating a single concurrent disappearance.
///
/// `last_vanished` remembers the previous vanished name. The same name
/// vanishing twice in a row is a `Remove` error so the caller cannot loop
/// forever on a listing that disagrees with the filesystem.
pub fn remove_oldest(
    oldest: &Entry,
    last_vanished: &mut Option<OsString>,
) -> Result<Removal, RetainError> {
    info!("Removing {}", oldest.path.display());
    match fs::remove_file(&oldest.path) {
        Ok(()) => {
            *last_vanished = None;
            Ok(Removal::Removed)
        }
        Err(e)
            if e.kind() == io::ErrorKind::NotFound
                && last_vanished.as_ref() != Some(&oldest.name) =>
        {
            warn!("{} vanished before removal, re-listing", oldest.path.display());
            *last_vanished = Some(oldest.name.clone());
            Ok(Removal::Vanished)
        }
        Err(source) => Err(RetainError::Remove {
            path: oldest.path.clone(),
            source,
        }),
    }
}

/// Report what [`prune`] would delete right now, without deleting anything.
pub fn plan(dir: &Path, policy: &RetentionPolicy) -> Result<PruneReport, RetainError> {
    let snapshot = Snapshot::read(dir)?;
    let mut report = PruneReport::new(dir, *policy, true);
    for entry in plan_deletions(&snapshot, policy) {
        info!("Would remove {}", entry.path.display());
        report.push(entry);
    }
    report.remaining = snapshot.len() - report.deleted.len();
    Ok(report)
}

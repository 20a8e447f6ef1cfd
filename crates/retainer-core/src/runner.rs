/// One full invocation: prune the backup folder (or each repository folder
/// under it), then run the backup tool.
///
/// The backup step runs whatever happened during pruning; deletions that
/// already succeeded stay on disk. A dry run lists, plans, and stops.
use crate::backup::BackupCommand;
use crate::model::Snapshot;
use crate::report::RunReport;
use crate::retention::{self, RetentionPolicy};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// How backups are arranged under the backup root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Backup files sit directly in the root.
    #[default]
    Flat,
    /// The backup tool writes one sub-folder per repository
    /// (`<root>/<repo>/<yyyyMMdd-HHmmss><repo>.trig.gz`). The policy applies
    /// to each sub-folder independently; files in the root are left alone.
    PerRepository,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub backup_dir: PathBuf,
    pub policy: RetentionPolicy,
    pub layout: Layout,
    /// Plan only. Nothing is deleted and the backup does not run.
    pub dry_run: bool,
    /// `None` skips the backup step.
    pub backup: Option<BackupCommand>,
}

impl RunOptions {
    /// Flat layout, real run, default backup tool.
    pub fn new(backup_dir: impl Into<PathBuf>, policy: RetentionPolicy) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            policy,
            layout: Layout::Flat,
            dry_run: false,
            backup: Some(BackupCommand::default()),
        }
    }
}

/// Prune, then back up, collecting everything into a [`RunReport`].
pub fn run(options: &RunOptions) -> RunReport {
    let mut report = RunReport::new();

    match options.layout {
        Layout::Flat => prune_folder(&options.backup_dir, options, &mut report),
        Layout::PerRepository => match Snapshot::sub_directories(&options.backup_dir) {
            Ok(repos) => {
                if repos.is_empty() {
                    warn!(
                        "No repository folders under {}",
                        options.backup_dir.display()
                    );
                }
                for repo in &repos {
                    prune_folder(repo, options, &mut report);
                }
            }
            Err(e) => {
                error!("{e}");
                report.record_prune_error(&e);
            }
        },
    }

    if options.dry_run {
        return report;
    }
    if let Some(command) = &options.backup {
        match command.run(None) {
            Ok(outcome) => report.record_backup(outcome),
            Err(e) => {
                error!("{e}");
                report.record_backup_error(&e);
            }
        }
    }

    report
}

/// Prune (or plan) a single folder. Failures are recorded, not returned, so
/// one bad repository folder does not stop the others.
fn prune_folder(dir: &Path, options: &RunOptions, report: &mut RunReport) {
    if options.dry_run {
        match retention::plan(dir, &options.policy) {
            Ok(plan) => report.record_prune(plan),
            Err(e) => {
                error!("{e}");
                report.record_prune_error(&e);
            }
        }
        return;
    }

    match retention::prune(dir, &options.policy) {
        Ok(pruned) => report.record_prune(pruned),
        Err(failure) => {
            error!("{failure}: {}", failure.error);
            report.record_prune_failure(failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RunStatus;
    use std::fs;
    use tempfile::TempDir;

    fn folder_with(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), b"backup").unwrap();
        }
    }

    fn options(dir: &Path, keep: i64) -> RunOptions {
        RunOptions {
            backup: None,
            ..RunOptions::new(dir, RetentionPolicy::new(keep))
        }
    }

    #[test]
    fn flat_run_prunes_the_root_once() {
        let tmp = TempDir::new().unwrap();
        folder_with(tmp.path(), &["a", "b", "c"]);

        let report = run(&options(tmp.path(), 1));
        assert_eq!(report.prunes.len(), 1);
        assert_eq!(report.prunes[0].deleted_names(), ["a", "b"]);
        assert_eq!(report.status(), RunStatus::Ok);
        assert!(report.backup.is_none());
    }

    #[test]
    fn dry_run_never_starts_the_backup() {
        let tmp = TempDir::new().unwrap();
        folder_with(tmp.path(), &["a", "b"]);
        let opts = RunOptions {
            dry_run: true,
            backup: Some(BackupCommand::new("retainer-missing-backup-tool")),
            ..options(tmp.path(), 1)
        };

        let report = run(&opts);
        assert!(report.prunes[0].dry_run);
        assert!(report.backup.is_none());
        assert!(report.backup_error.is_none());
        assert_eq!(report.status(), RunStatus::Ok);
        assert!(tmp.path().join("a").exists());
    }

    /// Only real folders count as repositories; a dangling link is ignored.
    #[cfg(unix)]
    #[test]
    fn per_repository_skips_dangling_links() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        folder_with(&tmp.path().join("repo-b"), &["1", "2", "3"]);
        symlink(tmp.path().join("nowhere"), tmp.path().join("repo-a")).unwrap();

        let opts = RunOptions {
            layout: Layout::PerRepository,
            ..options(tmp.path(), 1)
        };
        let report = run(&opts);
        assert_eq!(report.prunes.len(), 1);
        assert_eq!(report.prunes[0].deleted_names(), ["1", "2"]);
        assert_eq!(report.status(), RunStatus::Ok);
    }

    #[test]
    fn per_repository_on_missing_root_is_prune_failure() {
        let tmp = TempDir::new().unwrap();
        let opts = RunOptions {
            layout: Layout::PerRepository,
            ..options(&tmp.path().join("missing"), 1)
        };

        let report = run(&opts);
        assert!(report.prunes.is_empty());
        assert_eq!(report.prune_errors.len(), 1);
        assert_eq!(report.status(), RunStatus::PruneFailed);
    }
}

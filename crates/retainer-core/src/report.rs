/// Aggregated result of one run: pruning first, then the backup step.
///
/// The binary renders this either as a short human summary or as JSON, and
/// derives its exit code from [`RunReport::status`].
use crate::backup::BackupOutcome;
use crate::error::RetainError;
use crate::model::{format_count, format_size};
use crate::retention::{PruneFailure, PruneReport};
use chrono::{DateTime, Local};
use serde::Serialize;

/// Overall verdict of a run. Pruning problems take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    PruneFailed,
    BackupFailed,
}

impl RunStatus {
    /// Process exit code: 0 ok, 1 pruning failed, 3 backup failed.
    ///
    /// 2 is left to argument errors, which clap reports before a run starts.
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Ok => 0,
            RunStatus::PruneFailed => 1,
            RunStatus::BackupFailed => 3,
        }
    }
}

/// Everything that happened during one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    /// One report per pruned folder: the backup root itself, or each
    /// repository folder under it. A failed folder's report is partial.
    pub prunes: Vec<PruneReport>,
    pub prune_errors: Vec<String>,
    /// `None` when the backup step was skipped or could not start.
    pub backup: Option<BackupOutcome>,
    pub backup_error: Option<String>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            prunes: Vec::new(),
            prune_errors: Vec::new(),
            backup: None,
            backup_error: None,
        }
    }

    pub fn record_prune(&mut self, report: PruneReport) {
        self.prunes.push(report);
    }

    /// Keep the partial report alongside the error message.
    pub fn record_prune_failure(&mut self, failure: PruneFailure) {
        self.prune_errors.push(failure.error.to_string());
        self.prunes.push(failure.report);
    }

    /// Pruning never got as far as producing a report (e.g. dry-run listing failed).
    pub fn record_prune_error(&mut self, error: &RetainError) {
        self.prune_errors.push(error.to_string());
    }

    pub fn record_backup(&mut self, outcome: BackupOutcome) {
        self.backup = Some(outcome);
    }

    pub fn record_backup_error(&mut self, error: &RetainError) {
        self.backup_error = Some(error.to_string());
    }

    pub fn status(&self) -> RunStatus {
        if !self.prune_errors.is_empty() {
            RunStatus::PruneFailed
        } else if self.backup_error.is_some()
            || self.backup.as_ref().is_some_and(|b| !b.success)
        {
            RunStatus::BackupFailed
        } else {
            RunStatus::Ok
        }
    }

    /// Human-readable summary, one line per fact.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for prune in &self.prunes {
            let verb = if prune.dry_run { "Would remove" } else { "Removed" };
            lines.push(format!(
                "{verb} {} file(s) from {} ({}), {} remaining",
                format_count(prune.deleted.len() as u64),
                prune.dir.display(),
                format_size(prune.bytes_reclaimed),
                format_count(prune.remaining as u64),
            ));
            for entry in &prune.deleted {
                lines.push(format!("  {}  {}", entry.name, format_size(entry.size)));
            }
        }
        for err in &self.prune_errors {
            lines.push(format!("Pruning failed: {err}"));
        }

        match (&self.backup, &self.backup_error) {
            (Some(b), _) if b.success => lines.push(format!(
                "Backup `{}` succeeded in {:.1?}",
                b.command.display(),
                b.duration
            )),
            (Some(b), _) => lines.push(format!(
                "Backup `{}` failed ({})",
                b.command.display(),
                b.exit_code
                    .map_or_else(|| "terminated by signal".to_owned(), |c| format!("exit code {c}"))
            )),
            (None, Some(err)) => lines.push(format!("Backup failed: {err}")),
            (None, None) => lines.push("Backup skipped".to_owned()),
        }

        lines
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupCommand;
    use crate::retention::{plan, RetentionPolicy};
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn outcome(success: bool, exit_code: Option<i32>) -> BackupOutcome {
        BackupOutcome {
            command: BackupCommand::default(),
            exit_code,
            success,
            duration: Duration::from_millis(250),
        }
    }

    #[test]
    fn empty_report_is_ok_and_backup_skipped() {
        let report = RunReport::new();
        assert_eq!(report.status(), RunStatus::Ok);
        assert_eq!(report.summary_lines(), ["Backup skipped"]);
    }

    #[test]
    fn failed_backup_exit_is_backup_failed() {
        let mut report = RunReport::new();
        report.record_backup(outcome(false, Some(2)));
        assert_eq!(report.status(), RunStatus::BackupFailed);
        assert!(report.summary_lines()[0].contains("exit code 2"));
    }

    #[test]
    fn spawn_error_is_backup_failed() {
        let mut report = RunReport::new();
        report.record_backup_error(&RetainError::BackupSpawn {
            program: "java".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        });
        assert_eq!(report.status(), RunStatus::BackupFailed);
    }

    /// A pruning error outranks a backup failure in the overall status.
    #[test]
    fn prune_error_takes_precedence() {
        let mut report = RunReport::new();
        report.record_prune_error(&RetainError::ReadDir {
            path: PathBuf::from("/nope"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        });
        report.record_backup(outcome(false, Some(1)));
        assert_eq!(report.status(), RunStatus::PruneFailed);
    }

    #[test]
    fn summary_lists_deleted_files_and_totals() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.bak", "b.bak", "c.bak"] {
            fs::write(tmp.path().join(name), vec![0u8; 2048]).unwrap();
        }
        let mut report = RunReport::new();
        report.record_prune(plan(tmp.path(), &RetentionPolicy::new(1)).unwrap());
        report.record_backup(outcome(true, Some(0)));

        let lines = report.summary_lines();
        assert!(lines[0].starts_with("Would remove 2 file(s)"), "got: {}", lines[0]);
        assert!(lines[0].contains("4.0 KB"), "got: {}", lines[0]);
        assert!(lines[0].ends_with("1 remaining"), "got: {}", lines[0]);
        assert_eq!(lines[1], "  a.bak  2.0 KB");
        assert_eq!(lines[2], "  b.bak  2.0 KB");
        assert!(lines[3].starts_with("Backup `java -jar sesame-backup.jar` succeeded"));
    }

    #[test]
    fn status_maps_to_exit_codes() {
        assert_eq!(RunStatus::Ok.exit_code(), 0);
        assert_eq!(RunStatus::PruneFailed.exit_code(), 1);
        assert_eq!(RunStatus::BackupFailed.exit_code(), 3);
    }

    /// Every failed folder contributes its own line to the summary.
    #[test]
    fn each_prune_error_is_summarised() {
        let mut report = RunReport::new();
        for dir in ["/b/repo-a", "/b/repo-b"] {
            report.record_prune_error(&RetainError::ReadDir {
                path: PathBuf::from(dir),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        let failed = report
            .summary_lines()
            .into_iter()
            .filter(|l| l.starts_with("Pruning failed"))
            .count();
        assert_eq!(failed, 2);
        assert_eq!(report.status(), RunStatus::PruneFailed);
    }

    #[test]
    fn json_contains_status_fields() {
        let mut report = RunReport::new();
        report.record_backup(outcome(true, Some(0)));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["backup"]["success"], true);
        assert_eq!(json["backup"]["exit_code"], 0);
        assert_eq!(json["backup"]["command"]["program"], "java");
        assert_eq!(json["backup"]["duration"], 0.25);
        assert_eq!(json["prunes"], serde_json::json!([]));
    }
}

/// External backup tool invocation.
///
/// Runs once, after pruning, as a blocking child process with inherited
/// stdio. The exit status is captured in a [`BackupOutcome`] so callers can
/// report a failed backup instead of assuming success.
use crate::error::RetainError;
use serde::Serialize;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Program the backup step runs when no override is given.
pub const DEFAULT_BACKUP_PROGRAM: &str = "java";

/// Arguments passed to [`DEFAULT_BACKUP_PROGRAM`].
pub const DEFAULT_BACKUP_ARGS: &[&str] = &["-jar", "sesame-backup.jar"];

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for BackupCommand {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_PROGRAM).args(DEFAULT_BACKUP_ARGS.iter().copied())
    }
}

impl BackupCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from `argv`-style words (`["tar", "-czf", "out.tgz", "data"]`).
    ///
    /// Returns `None` for an empty slice.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.clone()).args(rest.iter().cloned()))
    }

    /// Shell-like rendering for logs; not re-parseable.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spawn the program, wait for it, and capture its exit status.
    ///
    /// `working_dir` defaults to the current directory. Only a failure to
    /// start the process is an `Err`; a non-zero exit is reported through
    /// [`BackupOutcome::success`].
    pub fn run(&self, working_dir: Option<&Path>) -> Result<BackupOutcome, RetainError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        info!("Running backup: {}", self.display());
        let start = Instant::now();
        let status = cmd.status().map_err(|source| RetainError::BackupSpawn {
            program: self.program.clone(),
            source,
        })?;
        let duration = start.elapsed();

        let outcome = BackupOutcome {
            command: self.clone(),
            exit_code: status.code(),
            success: status.success(),
            duration,
        };
        if outcome.success {
            debug!("Backup finished in {:.2?}", duration);
        } else {
            // No exit code means the child was killed by a signal.
            warn!(
                "Backup `{}` failed with {}",
                self.program,
                outcome
                    .exit_code
                    .map_or_else(|| "no exit code".to_owned(), |c| format!("exit code {c}"))
            );
        }
        Ok(outcome)
    }
}

/// Result of one backup run.
#[derive(Debug, Clone, Serialize)]
pub struct BackupOutcome {
    pub command: BackupCommand,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

/// Serialise a `Duration` as fractional seconds.
mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sesame_backup_jar() {
        let cmd = BackupCommand::default();
        assert_eq!(cmd.program, "java");
        assert_eq!(cmd.args, ["-jar", "sesame-backup.jar"]);
        assert_eq!(cmd.display(), "java -jar sesame-backup.jar");
    }

    #[test]
    fn from_argv_splits_program_and_args() {
        let argv: Vec<String> = ["rsync", "-a", "src/", "dst/"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cmd = BackupCommand::from_argv(&argv).unwrap();
        assert_eq!(cmd.program, "rsync");
        assert_eq!(cmd.args, ["-a", "src/", "dst/"]);
    }

    #[test]
    fn from_argv_rejects_empty() {
        assert!(BackupCommand::from_argv(&[]).is_none());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let cmd = BackupCommand::new("retainer-test-no-such-program-7f3a");
        match cmd.run(None) {
            Err(RetainError::BackupSpawn { program, .. }) => {
                assert_eq!(program, "retainer-test-no-such-program-7f3a");
            }
            other => panic!("expected BackupSpawn, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_captured() {
        let ok = BackupCommand::new("true").run(None).unwrap();
        assert!(ok.success);
        assert_eq!(ok.exit_code, Some(0));

        let failed = BackupCommand::new("false").run(None).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn arguments_and_working_dir_are_passed() {
        let tmp = tempfile::TempDir::new().unwrap();
        let outcome = BackupCommand::new("sh")
            .args(["-c", "touch made-by-backup"])
            .run(Some(tmp.path()))
            .unwrap();
        assert!(outcome.success);
        assert!(tmp.path().join("made-by-backup").exists());
    }
}

/// Errors raised while pruning a backup folder or running the backup tool.
///
/// Every variant carries the path or program it concerns so the binary can
/// print a useful message without extra context.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetainError {
    /// The backup folder is missing, not a directory, or not readable.
    #[error("cannot read backup folder {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file could not be removed (permissions, read-only filesystem, ...).
    ///
    /// `NotFound` never surfaces here: a file that vanished between listing
    /// and removal is skipped by the pruner.
    #[error("cannot remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backup program could not be started at all.
    #[error("cannot start backup program `{program}`: {source}")]
    BackupSpawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl RetainError {
    /// Path or program name the error refers to, for reports.
    pub fn subject(&self) -> String {
        match self {
            RetainError::ReadDir { path, .. } | RetainError::Remove { path, .. } => {
                path.display().to_string()
            }
            RetainError::BackupSpawn { program, .. } => program.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path_and_cause() {
        let err = RetainError::ReadDir {
            path: PathBuf::from("/backups/missing"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/backups/missing"), "got: {msg}");
        assert!(msg.contains("no such directory"), "got: {msg}");
    }

    #[test]
    fn subject_is_program_for_spawn_errors() {
        let err = RetainError::BackupSpawn {
            program: "java".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.subject(), "java");
    }
}

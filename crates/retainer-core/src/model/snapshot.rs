/// Point-in-time listing of a backup folder, sorted oldest-first by name.
///
/// Backup files are expected to carry a fixed-width timestamp prefix
/// (`20240131-120000repo.trig.gz`), so ascending byte-wise name order is
/// also chronological order. No timestamps are parsed.
///
/// A snapshot is never kept in sync with the filesystem: the pruner reads a
/// fresh one after every deletion.
use crate::error::RetainError;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A single file in the backup folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// File name only, compared byte-wise.
    pub name: OsString,
    /// `dir.join(name)`.
    pub path: PathBuf,
    /// Length in bytes at listing time. Zero if metadata was unavailable.
    pub size: u64,
}

/// Sorted file listing of one directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    dir: PathBuf,
    entries: Vec<Entry>,
}

impl Snapshot {
    /// List `dir` and sort its files ascending by name.
    ///
    /// Sub-directories are skipped: they are neither counted nor eligible
    /// for deletion. Entries that disappear while being listed are dropped.
    pub fn read(dir: &Path) -> Result<Self, RetainError> {
        let read_dir = fs::read_dir(dir).map_err(|source| RetainError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut entries = Vec::new();
        for dirent in read_dir {
            let dirent = dirent.map_err(|source| RetainError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;

            let file_type = match dirent.file_type() {
                Ok(ft) => ft,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(RetainError::ReadDir {
                        path: dir.to_path_buf(),
                        source,
                    })
                }
            };
            if file_type.is_dir() {
                trace!("Skipping sub-directory {:?}", dirent.file_name());
                continue;
            }

            let name = dirent.file_name();
            // Symlinks report their own length here, not the target's.
            let size = recorded_size(&name, dirent.metadata());
            entries.push(Entry {
                path: dir.join(&name),
                name,
                size,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Snapshot of {}: {} file(s)", dir.display(), entries.len());

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    /// Immediate sub-directories of `dir`, sorted by name.
    ///
    /// The backup tool writes one folder per repository under its backup
    /// root; each of these is pruned as an independent snapshot.
    pub fn sub_directories(dir: &Path) -> Result<Vec<PathBuf>, RetainError> {
        let read_dir_err = |source| RetainError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut dirs = Vec::new();
        for dirent in fs::read_dir(dir).map_err(read_dir_err)? {
            let dirent = dirent.map_err(read_dir_err)?;
            match dirent.file_type() {
                Ok(ft) if ft.is_dir() => dirs.push(dirent.path()),
                Ok(_) => trace!("Skipping top-level file {:?}", dirent.file_name()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(read_dir_err(source)),
            }
        }
        dirs.sort();
        debug!("{} repository folder(s) under {}", dirs.len(), dir.display());
        Ok(dirs)
    }

    /// Build a snapshot from names alone, without touching the filesystem.
    ///
    /// Sizes are zero. Used for planning against a listing obtained elsewhere.
    pub fn from_names<I, S>(dir: &Path, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut entries: Vec<Entry> = names
            .into_iter()
            .map(|n| {
                let name = n.into();
                Entry {
                    path: dir.join(&name),
                    name,
                    size: 0,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            dir: dir.to_path_buf(),
            entries,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The oldest (lexicographically smallest) file, if any.
    pub fn first(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &OsStr> {
        self.entries.iter().map(|e| e.name.as_os_str())
    }
}

/// File length from `metadata`, or zero when it could not be read.
///
/// A zero here under-reports reclaimed bytes, so the failure is traced.
fn recorded_size(name: &OsStr, metadata: io::Result<fs::Metadata>) -> u64 {
    match metadata {
        Ok(m) => m.len(),
        Err(e) => {
            trace!("No size for {:?}, counting 0 bytes: {e}", name);
            0
        }
    }
}

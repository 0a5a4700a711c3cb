//! publish::walker
//!
//! Enumerates everything under a publish root.
//!
//! The walk completes before anything is sent to the store: an unreadable
//! entry anywhere below the root fails the whole publish, so a tree is never
//! assembled from a partial listing.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use super::error::{PublishError, PublishStage};

/// One path found below the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEntry {
    /// A regular file, relative to the root
    File { path: PathBuf, executable: bool },
    /// A directory, relative to the root
    Directory { path: PathBuf },
}

impl WalkEntry {
    pub fn path(&self) -> &Path {
        match self {
            WalkEntry::File { path, .. } | WalkEntry::Directory { path } => path,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, WalkEntry::Directory { .. })
    }
}

/// Walker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Follow symbolic links instead of skipping them
    pub follow_symlinks: bool,
    /// Names excluded wherever they appear as a path component
    pub ignore: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore: vec![".git".to_string()],
        }
    }
}

/// Directory walker over a publish root.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    options: WalkOptions,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>, options: WalkOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Walk the root and return every descendant, sorted by path.
    ///
    /// The root itself is not part of the result.
    pub fn walk(&self) -> Result<Vec<WalkEntry>, PublishError> {
        let metadata = std::fs::metadata(&self.root).map_err(|source| self.io_error(&self.root, source))?;
        if !metadata.is_dir() {
            return Err(self.io_error(
                &self.root,
                io::Error::new(io::ErrorKind::InvalidInput, "publish root is not a directory"),
            ));
        }

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry));

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                self.io_error(&path, e.into())
            })?;

            if entry.file_name().to_str().is_none() {
                return Err(PublishError::NonUtf8Name {
                    path: entry.path().to_path_buf(),
                });
            }

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                warn!(path = %entry.path().display(), "skipping symbolic link");
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .map_err(|_| {
                    self.io_error(
                        entry.path(),
                        io::Error::new(io::ErrorKind::Other, "path escaped the publish root"),
                    )
                })?;

            if file_type.is_dir() {
                entries.push(WalkEntry::Directory { path: relative });
            } else if file_type.is_file() {
                let executable = self.is_executable(&entry)?;
                entries.push(WalkEntry::File {
                    path: relative,
                    executable,
                });
            } else {
                debug!(path = %entry.path().display(), "skipping special file");
            }
        }

        debug!(root = %self.root.display(), count = entries.len(), "walked publish root");
        Ok(entries)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name();
        self.options.ignore.iter().any(|pattern| name == pattern.as_str())
    }

    #[cfg(unix)]
    fn is_executable(&self, entry: &DirEntry) -> Result<bool, PublishError> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = entry
            .metadata()
            .map_err(|e| self.io_error(entry.path(), e.into()))?;
        Ok(metadata.permissions().mode() & 0o111 != 0)
    }

    #[cfg(not(unix))]
    fn is_executable(&self, _entry: &DirEntry) -> Result<bool, PublishError> {
        Ok(false)
    }

    fn io_error(&self, path: &Path, source: io::Error) -> PublishError {
        PublishError::Io {
            stage: PublishStage::Walk,
            path: path.to_path_buf(),
            source,
        }
    }
}

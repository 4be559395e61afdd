use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{Result, SageError};
use crate::fs::FileSystem;

/// The state of one dependency when a cache entry was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub path: PathBuf,
    /// `None` when the path did not exist; its later appearance invalidates.
    pub modified: Option<SystemTime>,
}

impl FileStamp {
    pub fn capture(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let modified = fs
            .last_modified(path)
            .map_err(|err| SageError::io(path, err))?;
        Ok(Self {
            path: path.to_path_buf(),
            modified,
        })
    }

    pub fn present(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified: Some(modified),
        }
    }

    pub fn absent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            modified: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.modified.is_some()
    }

    pub fn matches(&self, current: Option<SystemTime>, tolerance: Duration) -> bool {
        match (self.modified, current) {
            (None, None) => true,
            (Some(stored), Some(now)) => {
                let delta = stored
                    .duration_since(now)
                    .or_else(|_| now.duration_since(stored))
                    .unwrap_or(Duration::MAX);
                delta <= tolerance
            }
            _ => false,
        }
    }

    /// Re-stat the path. An absent stamp stays current while no regular file
    /// is there, the same test the resolver applies to candidates. For a
    /// present stamp, I/O failures count as a mismatch.
    pub fn is_current(&self, fs: &dyn FileSystem, tolerance: Duration) -> bool {
        if self.modified.is_none() {
            return !fs.is_file(&self.path);
        }
        match fs.last_modified(&self.path) {
            Ok(current) => self.matches(current, tolerance),
            Err(err) => {
                log::debug!("stamp check failed for {}: {err}", self.path.display());
                false
            }
        }
    }
}

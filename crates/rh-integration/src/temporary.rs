//! Temporary content created during a load

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files extracted or copied for the current content
#[derive(Debug, Default)]
pub struct TemporaryContent {
    paths: Vec<PathBuf>,
    /// Per-slot directories, removed after the files inside them
    dirs: Vec<PathBuf>,
}

impl TemporaryContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: PathBuf) {
        if self.paths.contains(&path) {
            warn!("Temporary content {} was written twice", path.display());
            return;
        }
        debug!("Tracking temporary content {}", path.display());
        self.paths.push(path);
    }

    /// Directory that receives files created for `slot`
    ///
    /// Slot 0 writes straight into `cache_dir`; later slots each get their
    /// own subdirectory so equal file names never overwrite each other.
    pub fn slot_dir(&mut self, cache_dir: &Path, slot: usize) -> PathBuf {
        if slot == 0 {
            return cache_dir.to_path_buf();
        }
        let dir = cache_dir.join(format!("slot{}", slot));
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir.clone());
        }
        dir
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.dirs.is_empty()
    }

    /// Delete every tracked file and forget it
    ///
    /// Failures are logged, never returned. Returns how many files were removed.
    pub fn remove_all(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed temporary content {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove temporary content {}: {}", path.display(), e),
            }
        }
        for dir in self.dirs.drain(..).rev() {
            match fs::remove_dir(&dir) {
                Ok(()) => debug!("Removed temporary directory {}", dir.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove temporary directory {}: {}", dir.display(), e),
            }
        }
        removed
    }
}

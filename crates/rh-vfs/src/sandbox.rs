//! Sandboxed file access
//!
//! On sandboxed targets a core may only open files below a few directories.
//! Content elsewhere is copied into the cache directory first, unless the
//! core reads through the frontend VFS interface.

use rh_core::config::SandboxConfig;
use rh_core::error::ContentReadError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SandboxPolicy {
    enabled: bool,
    accessible_dirs: Vec<PathBuf>,
}

impl SandboxPolicy {
    /// Build a policy; `cache_dir` is always accessible
    pub fn new(config: &SandboxConfig, cache_dir: &Path) -> Self {
        let mut accessible_dirs = config.accessible_dirs.clone();
        accessible_dirs.push(cache_dir.to_path_buf());
        Self {
            enabled: config.enabled,
            accessible_dirs,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a core may open `path` directly
    pub fn is_accessible(&self, path: &Path) -> bool {
        !self.enabled || self.accessible_dirs.iter().any(|dir| path.starts_with(dir))
    }

    /// Whether `path` must be copied before a core without VFS can open it
    pub fn needs_copy(&self, path: &Path, core_supports_vfs: bool) -> bool {
        self.enabled && !core_supports_vfs && !self.is_accessible(path)
    }
}

/// Copy `source` into `cache_dir`, keeping its file name
pub fn copy_to_cache(source: &Path, cache_dir: &Path) -> Result<PathBuf, ContentReadError> {
    let data = fs::read(source).map_err(|source_err| ContentReadError::CopyRead {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let file_name = source.file_name().unwrap_or(source.as_os_str());
    let dest = cache_dir.join(file_name);
    fs::create_dir_all(cache_dir)
        .and_then(|_| fs::write(&dest, &data))
        .map_err(|source| ContentReadError::CopyWrite {
            path: dest.clone(),
            source,
        })?;

    debug!("Copied {} to {} for sandboxed access", source.display(), dest.display());
    Ok(dest)
}

//! Error types for retrohost

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for the content runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Core load error: {0}")]
    CoreLoad(#[from] CoreLoadError),

    #[error("Content read error: {0}")]
    ContentRead(#[from] ContentReadError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Subsystem mismatch: {0}")]
    SubsystemMismatch(#[from] SubsystemError),

    #[error("Disc sheet error: {0}")]
    DiscSheet(#[from] DiscSheetError),

    #[error("Content slot {slot} is required but no path was supplied")]
    MissingRequiredContent { slot: usize },

    #[error("Core rejected content copied out of the sandbox; it most likely requires VFS support")]
    CoreRequiresVfs,

    #[error("Core failed to load content")]
    LoadRejected,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Errors raised while opening a core library
#[derive(Error, Debug)]
pub enum CoreLoadError {
    #[error("failed to open core {path:?}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("core is missing required symbol `{0}`")]
    MissingSymbol(&'static str),

    #[error("API version mismatch: expected {expected}, found {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },
}

/// Content could not be read, either directly or while copying it
#[derive(Error, Debug)]
pub enum ContentReadError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("copy read failed for {path:?}: {source}")]
    CopyRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("copy write failed for {path:?}: {source}")]
    CopyWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ContentReadError {
    /// Path of the file the failing operation touched
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::CopyRead { path, .. } | Self::CopyWrite { path, .. } => {
                path
            }
        }
    }

    /// Whether the failure happened during a sandbox copy
    pub fn is_copy_failure(&self) -> bool {
        matches!(self, Self::CopyRead { .. } | Self::CopyWrite { .. })
    }
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("unsupported archive format: {0:?}")]
    Unsupported(PathBuf),

    #[error("archive {archive:?} is corrupt: {reason}")]
    Corrupt { archive: PathBuf, reason: String },

    #[error("member {member:?} not found in {archive:?}")]
    MemberNotFound { archive: PathBuf, member: String },

    #[error("no member of {archive:?} matches the valid extensions [{extensions}]")]
    NoMatchingMember { archive: PathBuf, extensions: String },

    #[error("core declares no valid extensions to match members of {0:?} against")]
    NoValidExtensions(PathBuf),

    #[error("failed to write extracted member to {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Soft-patching errors
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("invalid {0} header")]
    InvalidHeader(&'static str),

    #[error("{0} patch is truncated")]
    Truncated(&'static str),

    #[error("{0} patch addresses data outside the target")]
    OutOfBounds(&'static str),

    #[error("{format} patch expects a {expected}-byte source, got {actual} bytes")]
    SourceSize {
        format: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("{format} source checksum mismatch: expected {expected:08x}, found {actual:08x}")]
    SourceChecksum {
        format: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("{format} target checksum mismatch: expected {expected:08x}, found {actual:08x}")]
    TargetChecksum {
        format: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("{format} patch checksum mismatch: expected {expected:08x}, found {actual:08x}")]
    PatchChecksum {
        format: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("failed to read patch {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Subsystem selection errors
#[derive(Error, Debug)]
pub enum SubsystemError {
    #[error("unknown subsystem \"{0}\"")]
    Unknown(String),

    #[error("no subsystem at index {0}")]
    InvalidIndex(usize),

    #[error("subsystem \"{ident}\" requires {expected} content files, but none were provided")]
    RequiresContent { ident: String, expected: usize },

    #[error("subsystem \"{ident}\" requires {expected} content files, but {supplied} were provided")]
    CountMismatch {
        ident: String,
        expected: usize,
        supplied: usize,
    },

    #[error("subsystem \"{ident}\" takes no content, but {supplied} content files were provided")]
    TakesNoContent { ident: String, supplied: usize },

    #[error("at most {max} subsystem content files can be queued")]
    TooManyRoms { max: usize },
}

/// CUE/GDI sheet errors
#[derive(Error, Debug)]
pub enum DiscSheetError {
    #[error("malformed {kind} sheet at line {line}: {reason}")]
    Malformed {
        kind: &'static str,
        line: usize,
        reason: String,
    },

    #[error("{0} sheet contains no data track")]
    NoDataTrack(&'static str),

    #[error("failed to access track file {path:?}: {source}")]
    TrackFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SubsystemError::CountMismatch {
            ident: "sufami_turbo".to_string(),
            expected: 2,
            supplied: 1,
        };
        assert_eq!(
            format!("{}", err),
            "subsystem \"sufami_turbo\" requires 2 content files, but 1 were provided"
        );

        let err = CoreLoadError::ApiVersionMismatch {
            expected: 1,
            found: 2,
        };
        assert_eq!(
            format!("{}", err),
            "API version mismatch: expected 1, found 2"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err = SubsystemError::Unknown("nope".to_string());
        let runtime_err: RuntimeError = err.into();
        assert!(matches!(runtime_err, RuntimeError::SubsystemMismatch(_)));

        let err = PatchError::InvalidHeader("IPS");
        let runtime_err: RuntimeError = err.into();
        assert!(matches!(runtime_err, RuntimeError::Patch(_)));
    }

    #[test]
    fn test_content_read_error_reason() {
        let err = ContentReadError::CopyWrite {
            path: PathBuf::from("/cache/game.bin"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.is_copy_failure());
        assert_eq!(err.path(), Path::new("/cache/game.bin"));

        let err = ContentReadError::Read {
            path: PathBuf::from("missing.sfc"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!err.is_copy_failure());
    }
}

//! Content paths and content kinds
//!
//! A content path names either a plain file or one member of an archive,
//! written `archive.zip#member`.

use std::fmt;
use std::path::{Path, PathBuf};

/// Separates an archive path from the member inside it
pub const ARCHIVE_DELIMITER: char = '#';

/// Container extensions recognized as archives
///
/// Only zip can be opened; the rest are reported as unsupported.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "7z", "rar", "tar", "gz", "xz", "bz2"];

const MOVIE_EXTENSIONS: &[&str] = &[
    "3gp", "avi", "f4v", "flv", "h264", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogm",
    "ts", "vob", "webm", "wmv",
];

const MUSIC_EXTENSIONS: &[&str] = &[
    "aac", "flac", "it", "m4a", "mod", "mp3", "ogg", "opus", "s3m", "wav", "wma", "xm",
];

const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "tga", "webp"];

fn lower_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Check whether an extension belongs to a container format
pub fn is_archive_extension(extension: &str) -> bool {
    ARCHIVE_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Where a content item lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPath {
    File(PathBuf),
    ArchiveMember { archive: PathBuf, member: String },
}

impl ContentPath {
    /// Parse a raw path, splitting `archive.ext#member` when the part before
    /// the delimiter names an archive
    pub fn parse(raw: &str) -> Self {
        if let Some((archive, member)) = raw.rsplit_once(ARCHIVE_DELIMITER) {
            let is_archive = lower_extension(archive).is_some_and(|ext| is_archive_extension(&ext));
            if is_archive && !member.is_empty() {
                return Self::ArchiveMember {
                    archive: PathBuf::from(archive),
                    member: member.to_string(),
                };
            }
        }
        Self::File(PathBuf::from(raw))
    }

    pub fn from_path(path: &Path) -> Self {
        Self::parse(&path.to_string_lossy())
    }

    /// The file that exists on disk: the plain file or the archive
    pub fn outer_file(&self) -> &Path {
        match self {
            Self::File(path) => path,
            Self::ArchiveMember { archive, .. } => archive,
        }
    }

    /// Lowercase extension of the content itself (the member for archives)
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::File(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase()),
            Self::ArchiveMember { member, .. } => lower_extension(member),
        }
    }

    /// A plain file whose extension marks it as a container
    pub fn is_bare_archive(&self) -> bool {
        matches!(self, Self::File(_)) && self.extension().is_some_and(|ext| is_archive_extension(&ext))
    }

    /// Path handed to a core that opens archive members itself
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.to_string())
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::ArchiveMember { archive, member } => {
                write!(f, "{}{}{}", archive.display(), ARCHIVE_DELIMITER, member)
            }
        }
    }
}

/// Disc description sheet formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscSheet {
    Cue,
    Gdi,
}

/// Streaming media handled by built-in players
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Music,
    Image,
}

/// What a content item is, decided from its path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Rom,
    Archive,
    Disc(DiscSheet),
    Media(MediaKind),
    Contentless,
}

impl ContentKind {
    pub fn detect(path: Option<&ContentPath>) -> Self {
        let Some(path) = path else {
            return Self::Contentless;
        };
        if path.outer_file().as_os_str().is_empty() {
            return Self::Contentless;
        }
        if path.is_bare_archive() {
            return Self::Archive;
        }

        match path.extension().as_deref() {
            Some("cue") => Self::Disc(DiscSheet::Cue),
            Some("gdi") => Self::Disc(DiscSheet::Gdi),
            Some(ext) if MOVIE_EXTENSIONS.contains(&ext) => Self::Media(MediaKind::Movie),
            Some(ext) if MUSIC_EXTENSIONS.contains(&ext) => Self::Media(MediaKind::Music),
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => Self::Media(MediaKind::Image),
            _ => Self::Rom,
        }
    }

    /// Media is streamed, never patched or checksummed
    pub fn is_media(self) -> bool {
        matches!(self, Self::Media(_))
    }
}

//! Zip archive access

use crate::content_path::is_archive_extension;
use rh_core::error::{ContentReadError, ExtractionError};
use rh_core::{Result, RuntimeError};
use rh_ffi::extension_in;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

/// Check whether an archive at `path` can be opened
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn member_extension(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

/// An open zip archive
pub struct Archive {
    path: PathBuf,
    zip: ZipArchive<File>,
}

impl Archive {
    pub fn open(path: &Path) -> Result<Self> {
        if !is_supported(path) {
            let known = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(is_archive_extension);
            debug!("Refusing archive {} (known container: {})", path.display(), known);
            return Err(ExtractionError::Unsupported(path.to_path_buf()).into());
        }

        let file = File::open(path).map_err(|source| ContentReadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let zip = ZipArchive::new(file).map_err(|e| corrupt(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of every file member, directories excluded
    pub fn member_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.zip.len());
        for i in 0..self.zip.len() {
            let file = self.zip.by_index(i).map_err(|e| corrupt(&self.path, e))?;
            if !file.is_dir() {
                names.push(file.name().to_string());
            }
        }
        Ok(names)
    }

    /// First member whose extension is in `extensions`
    pub fn find_member(&mut self, extensions: &[String]) -> Result<String> {
        if extensions.is_empty() {
            return Err(ExtractionError::NoValidExtensions(self.path.clone()).into());
        }

        self.member_names()?
            .into_iter()
            .find(|name| member_extension(name).is_some_and(|ext| extension_in(extensions, ext)))
            .ok_or_else(|| {
                ExtractionError::NoMatchingMember {
                    archive: self.path.clone(),
                    extensions: extensions.join("|"),
                }
                .into()
            })
    }

    /// Decompress one member into memory
    pub fn read_member(&mut self, member: &str) -> Result<Vec<u8>> {
        let mut file = self.zip.by_name(member).map_err(|e| member_error(&self.path, member, e))?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| corrupt(&self.path, ZipError::Io(e)))?;
        Ok(data)
    }

    /// CRC32 recorded in the archive directory for `member`
    pub fn member_crc32(&mut self, member: &str) -> Result<u32> {
        let file = self.zip.by_name(member).map_err(|e| member_error(&self.path, member, e))?;
        Ok(file.crc32())
    }

    /// Write one member into `dest_dir`, named after its last path component
    pub fn extract_member(&mut self, member: &str, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = Path::new(member)
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| ExtractionError::MemberNotFound {
                archive: self.path.clone(),
                member: member.to_string(),
            })?;
        let dest = dest_dir.join(file_name);

        let mut file = self.zip.by_name(member).map_err(|e| member_error(&self.path, member, e))?;

        let write_error = |source: io::Error| ExtractionError::Write {
            path: dest.clone(),
            source,
        };
        fs::create_dir_all(dest_dir).map_err(write_error)?;
        let mut out = File::create(&dest).map_err(write_error)?;
        io::copy(&mut file, &mut out).map_err(write_error)?;

        debug!("Extracted {} from {} to {}", member, self.path.display(), dest.display());
        Ok(dest)
    }
}

fn member_error(archive: &Path, member: &str, error: ZipError) -> RuntimeError {
    match error {
        ZipError::FileNotFound => ExtractionError::MemberNotFound {
            archive: archive.to_path_buf(),
            member: member.to_string(),
        }
        .into(),
        other => corrupt(archive, other),
    }
}

fn corrupt(archive: &Path, error: ZipError) -> RuntimeError {
    ExtractionError::Corrupt {
        archive: archive.to_path_buf(),
        reason: error.to_string(),
    }
    .into()
}

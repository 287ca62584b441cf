//! Soft-patching
//!
//! IPS, UPS and BPS patches are applied to content held in memory before the
//! core sees it. Patches are found next to the content (`game.sfc` pairs with
//! `game.ips`) or named explicitly on the command line.

pub mod bps;
pub mod ips;
pub mod ups;

use rh_core::config::PatchConfig;
use rh_core::error::PatchError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchFormat {
    Ips,
    Bps,
    Ups,
}

impl PatchFormat {
    /// Order in which sidecar patches are looked for
    pub const DISCOVERY_ORDER: [PatchFormat; 3] = [Self::Ips, Self::Bps, Self::Ups];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Ips => "ips",
            Self::Bps => "bps",
            Self::Ups => "ups",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ips => "IPS",
            Self::Bps => "BPS",
            Self::Ups => "UPS",
        }
    }

    /// Produce the patched image of `source`
    pub fn apply(self, patch: &[u8], source: &[u8]) -> Result<Vec<u8>, PatchError> {
        match self {
            Self::Ips => ips::apply(patch, source),
            Self::Bps => bps::apply(patch, source),
            Self::Ups => ups::apply(patch, source),
        }
    }
}

/// Patch selection for one load
#[derive(Debug, Clone)]
pub struct PatchSettings {
    pub enabled: bool,
    pub ips: Option<PathBuf>,
    pub bps: Option<PathBuf>,
    pub ups: Option<PathBuf>,
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ips: None,
            bps: None,
            ups: None,
        }
    }
}

impl PatchSettings {
    pub fn from_config(config: &PatchConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn explicit(&self) -> Vec<(PatchFormat, &Path)> {
        [
            (PatchFormat::Ips, self.ips.as_deref()),
            (PatchFormat::Bps, self.bps.as_deref()),
            (PatchFormat::Ups, self.ups.as_deref()),
        ]
        .into_iter()
        .filter_map(|(format, path)| path.map(|path| (format, path)))
        .collect()
    }

    /// The patch to apply to `content`, if any
    pub fn locate(&self, content: &Path) -> Option<(PatchFormat, PathBuf)> {
        if !self.enabled {
            return None;
        }

        let explicit = self.explicit();
        match explicit.as_slice() {
            [] => {}
            [(format, path)] => {
                if path.is_file() {
                    return Some((*format, path.to_path_buf()));
                }
                warn!("{} patch {} does not exist", format.name(), path.display());
                return None;
            }
            _ => {
                warn!("More than one patch type requested, skipping patching");
                return None;
            }
        }

        PatchFormat::DISCOVERY_ORDER
            .into_iter()
            .map(|format| (format, content.with_extension(format.extension())))
            .find(|(_, path)| path.is_file())
    }
}

/// A patch that was applied during a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    pub format: PatchFormat,
    pub path: PathBuf,
}

/// Patch `data` in place when a patch for `content` is found
pub fn apply_patch(
    settings: &PatchSettings,
    content: &Path,
    data: &mut Vec<u8>,
) -> Result<Option<AppliedPatch>, PatchError> {
    let Some((format, path)) = settings.locate(content) else {
        debug!("No patch for {}", content.display());
        return Ok(None);
    };

    let patch = fs::read(&path).map_err(|source| PatchError::Read {
        path: path.clone(),
        source,
    })?;
    *data = format.apply(&patch, data)?;

    info!("Applied {} patch {}", format.name(), path.display());
    Ok(Some(AppliedPatch { format, path }))
}

/// Cursor over a patch body that stops short of the checksum footer
pub(crate) struct PatchReader<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    format: &'static str,
}

impl<'a> PatchReader<'a> {
    pub(crate) fn new(data: &'a [u8], start: usize, end: usize, format: &'static str) -> Self {
        Self {
            data,
            pos: start,
            end,
            format,
        }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    pub(crate) fn byte(&mut self) -> Result<u8, PatchError> {
        if self.pos >= self.end {
            return Err(PatchError::Truncated(self.format));
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8], PatchError> {
        let stop = self
            .pos
            .checked_add(len)
            .filter(|&stop| stop <= self.end)
            .ok_or(PatchError::Truncated(self.format))?;
        let bytes = &self.data[self.pos..stop];
        self.pos = stop;
        Ok(bytes)
    }

    /// Variable-length integer shared by UPS and BPS
    pub(crate) fn varint(&mut self) -> Result<u64, PatchError> {
        let mut value: u64 = 0;
        let mut shift: u64 = 1;
        loop {
            let x = self.byte()?;
            value = u64::from(x & 0x7f)
                .checked_mul(shift)
                .and_then(|v| value.checked_add(v))
                .ok_or(PatchError::OutOfBounds(self.format))?;
            if x & 0x80 != 0 {
                return Ok(value);
            }
            shift = shift
                .checked_shl(7)
                .filter(|&s| s < (1 << 57))
                .ok_or(PatchError::OutOfBounds(self.format))?;
            value = value
                .checked_add(shift)
                .ok_or(PatchError::OutOfBounds(self.format))?;
        }
    }
}

/// Read the three little-endian CRC32s closing a UPS or BPS patch
pub(crate) fn checksum_footer(patch: &[u8]) -> (u32, u32, u32) {
    let footer = &patch[patch.len() - 12..];
    let word = |i: usize| u32::from_le_bytes([footer[i], footer[i + 1], footer[i + 2], footer[i + 3]]);
    (word(0), word(4), word(8))
}

/// Check the patch's own CRC32 over everything but its last four bytes
pub(crate) fn verify_patch_checksum(patch: &[u8], expected: u32, format: &'static str) -> Result<(), PatchError> {
    let actual = crc32fast::hash(&patch[..patch.len() - 4]);
    if actual != expected {
        return Err(PatchError::PatchChecksum {
            format,
            expected,
            actual,
        });
    }
    Ok(())
}

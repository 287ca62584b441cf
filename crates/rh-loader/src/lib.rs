//! Content transforms for retrohost: soft-patching and CRC32 identification

pub mod checksum;
pub mod patch;

pub use checksum::{content_crc32, crc32, file_crc32};
pub use patch::{apply_patch, AppliedPatch, PatchFormat, PatchSettings};

//! BPS patches

use super::{checksum_footer, verify_patch_checksum, PatchReader};
use rh_core::error::PatchError;

const FORMAT: &str = "BPS";
const HEADER: &[u8] = b"BPS1";
const FOOTER_LEN: usize = 12;

const SOURCE_READ: u64 = 0;
const TARGET_READ: u64 = 1;
const SOURCE_COPY: u64 = 2;
const TARGET_COPY: u64 = 3;

fn to_usize(value: u64) -> Result<usize, PatchError> {
    usize::try_from(value).map_err(|_| PatchError::OutOfBounds(FORMAT))
}

/// Move a copy cursor by a signed offset (low bit is the sign)
fn relative(cursor: usize, encoded: u64) -> Result<usize, PatchError> {
    let magnitude = to_usize(encoded >> 1)?;
    let moved = if encoded & 1 != 0 {
        cursor.checked_sub(magnitude)
    } else {
        cursor.checked_add(magnitude)
    };
    moved.ok_or(PatchError::OutOfBounds(FORMAT))
}

pub fn apply(patch: &[u8], source: &[u8]) -> Result<Vec<u8>, PatchError> {
    if patch.len() < HEADER.len() + 3 + FOOTER_LEN || !patch.starts_with(HEADER) {
        return Err(PatchError::InvalidHeader(FORMAT));
    }

    let (source_crc, target_crc, patch_crc) = checksum_footer(patch);
    verify_patch_checksum(patch, patch_crc, FORMAT)?;

    let mut reader = PatchReader::new(patch, HEADER.len(), patch.len() - FOOTER_LEN, FORMAT);
    let source_size = reader.varint()?;
    let target_size = to_usize(reader.varint()?)?;
    let metadata_size = to_usize(reader.varint()?)?;
    reader.bytes(metadata_size)?;

    if source.len() as u64 != source_size {
        return Err(PatchError::SourceSize {
            format: FORMAT,
            expected: source_size,
            actual: source.len() as u64,
        });
    }
    let actual = crc32fast::hash(source);
    if actual != source_crc {
        return Err(PatchError::SourceChecksum {
            format: FORMAT,
            expected: source_crc,
            actual,
        });
    }

    // The header size is untrusted; grow with the actions instead.
    let mut target: Vec<u8> = Vec::with_capacity(target_size.min(source.len() + patch.len()));
    let mut source_cursor: usize = 0;
    let mut target_cursor: usize = 0;

    while !reader.at_end() {
        let action = reader.varint()?;
        let length = to_usize((action >> 2) + 1)?;
        match target.len().checked_add(length) {
            Some(end) if end <= target_size => {}
            _ => return Err(PatchError::OutOfBounds(FORMAT)),
        }
        target
            .try_reserve(length)
            .map_err(|_| PatchError::OutOfBounds(FORMAT))?;

        match action & 3 {
            SOURCE_READ => {
                let start = target.len();
                let bytes = source
                    .get(start..start.saturating_add(length))
                    .ok_or(PatchError::OutOfBounds(FORMAT))?;
                target.extend_from_slice(bytes);
            }
            TARGET_READ => {
                target.extend_from_slice(reader.bytes(length)?);
            }
            SOURCE_COPY => {
                source_cursor = relative(source_cursor, reader.varint()?)?;
                let bytes = source
                    .get(source_cursor..source_cursor.saturating_add(length))
                    .ok_or(PatchError::OutOfBounds(FORMAT))?;
                target.extend_from_slice(bytes);
                source_cursor += length;
            }
            TARGET_COPY => {
                target_cursor = relative(target_cursor, reader.varint()?)?;
                // The copy may overlap the bytes it produces, so go one at a time.
                for _ in 0..length {
                    let byte = *target
                        .get(target_cursor)
                        .ok_or(PatchError::OutOfBounds(FORMAT))?;
                    target.push(byte);
                    target_cursor += 1;
                }
            }
            _ => unreachable!(),
        }
    }

    if target.len() != target_size {
        return Err(PatchError::Truncated(FORMAT));
    }
    let actual = crc32fast::hash(&target);
    if actual != target_crc {
        return Err(PatchError::TargetChecksum {
            format: FORMAT,
            expected: target_crc,
            actual,
        });
    }

    Ok(target)
}

//! UPS patches
//!
//! XOR runs between source and target, each preceded by a skip count and
//! terminated by a zero byte. Because XOR is symmetric a UPS patch also
//! turns the target back into the source.

use super::{checksum_footer, verify_patch_checksum, PatchReader};
use rh_core::error::PatchError;
use tracing::debug;

const FORMAT: &str = "UPS";
const HEADER: &[u8] = b"UPS1";
const FOOTER_LEN: usize = 12;

pub fn apply(patch: &[u8], source: &[u8]) -> Result<Vec<u8>, PatchError> {
    if patch.len() < HEADER.len() + 2 + FOOTER_LEN || !patch.starts_with(HEADER) {
        return Err(PatchError::InvalidHeader(FORMAT));
    }

    let (source_crc, target_crc, patch_crc) = checksum_footer(patch);
    verify_patch_checksum(patch, patch_crc, FORMAT)?;

    let mut reader = PatchReader::new(patch, HEADER.len(), patch.len() - FOOTER_LEN, FORMAT);
    let source_size = reader.varint()?;
    let target_size = reader.varint()?;

    let input_crc = crc32fast::hash(source);
    let input_size = source.len() as u64;
    let (output_size, expected_output_crc) = if input_size == source_size && input_crc == source_crc {
        (target_size, target_crc)
    } else if input_size == target_size && input_crc == target_crc {
        debug!("Applying UPS patch in reverse");
        (source_size, source_crc)
    } else if input_size != source_size {
        return Err(PatchError::SourceSize {
            format: FORMAT,
            expected: source_size,
            actual: input_size,
        });
    } else {
        return Err(PatchError::SourceChecksum {
            format: FORMAT,
            expected: source_crc,
            actual: input_crc,
        });
    };

    // Every byte past the input comes from an XOR run in the body.
    let body_len = (patch.len() - FOOTER_LEN - HEADER.len()) as u64;
    if output_size > input_size.saturating_add(body_len) {
        return Err(PatchError::OutOfBounds(FORMAT));
    }
    let output_size = usize::try_from(output_size).map_err(|_| PatchError::OutOfBounds(FORMAT))?;
    let mut target: Vec<u8> = Vec::new();
    target
        .try_reserve_exact(output_size)
        .map_err(|_| PatchError::OutOfBounds(FORMAT))?;
    target.extend_from_slice(&source[..source.len().min(output_size)]);
    target.resize(output_size, 0);

    let mut offset: usize = 0;
    while !reader.at_end() {
        let skip = usize::try_from(reader.varint()?).map_err(|_| PatchError::OutOfBounds(FORMAT))?;
        offset = offset
            .checked_add(skip)
            .ok_or(PatchError::OutOfBounds(FORMAT))?;
        loop {
            let xor = reader.byte()?;
            if let Some(byte) = target.get_mut(offset) {
                *byte ^= xor;
            }
            offset = offset.saturating_add(1);
            if xor == 0 {
                break;
            }
        }
    }

    let actual = crc32fast::hash(&target);
    if actual != expected_output_crc {
        return Err(PatchError::TargetChecksum {
            format: FORMAT,
            expected: expected_output_crc,
            actual,
        });
    }

    Ok(target)
}

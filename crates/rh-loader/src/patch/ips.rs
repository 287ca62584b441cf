//! IPS patches
//!
//! `PATCH`, then records of a 24-bit big-endian offset and 16-bit size
//! followed by that many bytes. A zero size marks a run-length record
//! (16-bit count, one fill byte). `EOF` ends the patch and may be followed by
//! a 24-bit length the target is truncated to.

use super::PatchReader;
use rh_core::error::PatchError;

const FORMAT: &str = "IPS";
const HEADER: &[u8] = b"PATCH";
const FOOTER: &[u8] = b"EOF";

fn be24(bytes: &[u8]) -> usize {
    (usize::from(bytes[0]) << 16) | (usize::from(bytes[1]) << 8) | usize::from(bytes[2])
}

fn be16(bytes: &[u8]) -> usize {
    (usize::from(bytes[0]) << 8) | usize::from(bytes[1])
}

fn write_at(target: &mut Vec<u8>, offset: usize, bytes: &[u8]) {
    let end = offset + bytes.len();
    if target.len() < end {
        target.resize(end, 0);
    }
    target[offset..end].copy_from_slice(bytes);
}

pub fn apply(patch: &[u8], source: &[u8]) -> Result<Vec<u8>, PatchError> {
    if patch.len() < HEADER.len() + FOOTER.len() || !patch.starts_with(HEADER) {
        return Err(PatchError::InvalidHeader(FORMAT));
    }

    let mut reader = PatchReader::new(patch, HEADER.len(), patch.len(), FORMAT);
    let mut target = source.to_vec();

    loop {
        let offset_bytes = reader.bytes(3)?;
        if offset_bytes == FOOTER {
            if let Ok(length) = reader.bytes(3) {
                let length = be24(length);
                if length < target.len() {
                    target.truncate(length);
                }
            }
            return Ok(target);
        }

        let offset = be24(offset_bytes);
        let size = be16(reader.bytes(2)?);
        if size == 0 {
            let count = be16(reader.bytes(2)?);
            let value = reader.byte()?;
            write_at(&mut target, offset, &vec![value; count]);
        } else {
            let data = reader.bytes(size)?;
            write_at(&mut target, offset, data);
        }
    }
}

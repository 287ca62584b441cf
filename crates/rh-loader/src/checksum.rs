//! CRC32 content identification

use crc32fast::Hasher;
use rh_core::error::ContentReadError;
use rh_core::Result;
use rh_vfs::{largest_data_track, Archive, ContentKind, ContentPath};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

const CHUNK_SIZE: usize = 64 * 1024;

pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

fn hash_reader(reader: &mut impl Read, mut remaining: Option<u64>) -> io::Result<u32> {
    let mut hasher = Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let want = match remaining {
            Some(0) => break,
            Some(left) => CHUNK_SIZE.min(left as usize),
            None => CHUNK_SIZE,
        };
        let read = match reader.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..read]);
        if let Some(left) = remaining.as_mut() {
            *left -= read as u64;
        }
    }

    Ok(hasher.finalize())
}

fn read_error(path: &Path) -> impl FnOnce(io::Error) -> ContentReadError + '_ {
    move |source| ContentReadError::Read {
        path: path.to_path_buf(),
        source,
    }
}

/// Stream a whole file through CRC32
pub fn file_crc32(path: &Path) -> std::result::Result<u32, ContentReadError> {
    let mut file = File::open(path).map_err(read_error(path))?;
    hash_reader(&mut file, None).map_err(read_error(path))
}

/// CRC32 of `size` bytes starting at `offset`
pub fn file_range_crc32(path: &Path, offset: u64, size: u64) -> std::result::Result<u32, ContentReadError> {
    let mut file = File::open(path).map_err(read_error(path))?;
    file.seek(SeekFrom::Start(offset)).map_err(read_error(path))?;
    hash_reader(&mut file, Some(size)).map_err(read_error(path))
}

/// Identifying CRC32 of content on disk
///
/// Disc sheets hash their largest data track; archive members use the CRC
/// recorded in the archive.
pub fn content_crc32(path: &ContentPath) -> Result<u32> {
    match (ContentKind::detect(Some(path)), path) {
        (ContentKind::Disc(sheet), ContentPath::File(sheet_path)) => {
            let track = largest_data_track(sheet, sheet_path)?;
            debug!(
                "Hashing data track {} ({} bytes at {})",
                track.path.display(),
                track.size,
                track.offset
            );
            Ok(file_range_crc32(&track.path, track.offset, track.size)?)
        }
        (_, ContentPath::ArchiveMember { archive, member }) => {
            Archive::open(archive)?.member_crc32(member)
        }
        (_, ContentPath::File(file)) => Ok(file_crc32(file)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_file_crc_matches_buffer_crc() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        assert_eq!(file_crc32(&path).unwrap(), crc32(&data));
        assert_eq!(
            file_range_crc32(&path, 1000, 5000).unwrap(),
            crc32(&data[1000..6000])
        );
    }

    #[test]
    fn test_known_value() {
        assert_eq!(crc32(b"123456789"), 0xcbf4_3926);
    }

    #[test]
    fn test_missing_file() {
        let err = file_crc32(Path::new("/nonexistent/rom.bin")).unwrap_err();
        assert!(matches!(err, ContentReadError::Read { .. }));
    }

    #[test]
    fn test_cue_hashes_data_track() {
        let dir = TempDir::new().unwrap();
        let track: Vec<u8> = (0..2352 * 3).map(|i| (i % 7) as u8).collect();
        let mut image = track.clone();
        image.extend(vec![0xaa; 2352 * 2]);
        fs::write(dir.path().join("disc.bin"), &image).unwrap();
        let sheet = dir.path().join("disc.cue");
        fs::write(
            &sheet,
            "FILE disc.bin BINARY\nTRACK 01 MODE1/2352\nINDEX 01 00:00:00\n\
             TRACK 02 AUDIO\nINDEX 01 00:00:03\n",
        )
        .unwrap();

        let crc = content_crc32(&ContentPath::File(sheet)).unwrap();
        assert_eq!(crc, crc32(&track));
    }

    #[test]
    fn test_archive_member_crc() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("pack.zip");
        let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
        zip.start_file("game.bin", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"cartridge").unwrap();
        zip.finish().unwrap();

        let path = ContentPath::ArchiveMember {
            archive,
            member: "game.bin".to_string(),
        };
        assert_eq!(content_crc32(&path).unwrap(), crc32(b"cartridge"));
    }
}

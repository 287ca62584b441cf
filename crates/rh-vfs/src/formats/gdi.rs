//! GDI sheet parsing
//!
//! The first line holds the track count; each following line is
//! `number lba type sector_size file offset`, with type 4 for data and 0 for
//! audio. Every track lives in its own file.

use super::{tokenize, DataTrack};
use rh_core::error::DiscSheetError;
use std::fs;
use std::path::{Path, PathBuf};

const KIND: &str = "GDI";

const TYPE_AUDIO: u32 = 0;
const TYPE_DATA: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdiTrack {
    pub number: u32,
    pub lba: u32,
    pub is_data: bool,
    pub sector_size: u32,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GdiSheet {
    pub tracks: Vec<GdiTrack>,
}

fn malformed(line: usize, reason: impl Into<String>) -> DiscSheetError {
    DiscSheetError::Malformed {
        kind: KIND,
        line,
        reason: reason.into(),
    }
}

fn field(tokens: &[String], index: usize, line: usize, name: &str) -> Result<u32, DiscSheetError> {
    tokens
        .get(index)
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| malformed(line, format!("invalid {}", name)))
}

impl GdiSheet {
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, DiscSheetError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, tokenize(line)))
            .filter(|(_, tokens)| !tokens.is_empty());

        let (count_line, count_tokens) = lines
            .next()
            .ok_or_else(|| malformed(1, "missing track count"))?;
        let expected = field(&count_tokens, 0, count_line, "track count")? as usize;

        // One track per remaining line at most
        let mut tracks = Vec::with_capacity(expected.min(text.lines().count()));
        for (line, tokens) in lines {
            let number = field(&tokens, 0, line, "track number")?;
            let lba = field(&tokens, 1, line, "LBA")?;
            let is_data = match field(&tokens, 2, line, "track type")? {
                TYPE_DATA => true,
                TYPE_AUDIO => false,
                other => return Err(malformed(line, format!("unknown track type {}", other))),
            };
            let sector_size = field(&tokens, 3, line, "sector size")?;
            let file = tokens
                .get(4)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| malformed(line, "missing track file"))?;

            tracks.push(GdiTrack {
                number,
                lba,
                is_data,
                sector_size,
                path: base_dir.join(file),
            });
        }

        if tracks.len() != expected {
            return Err(malformed(
                count_line,
                format!("declares {} tracks but lists {}", expected, tracks.len()),
            ));
        }

        Ok(Self { tracks })
    }

    pub fn load(path: &Path) -> Result<Self, DiscSheetError> {
        let text = fs::read_to_string(path).map_err(|source| DiscSheetError::TrackFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path.parent().unwrap_or(Path::new("")))
    }

    /// The data track with the largest backing file
    pub fn largest_data_track(&self) -> Result<DataTrack, DiscSheetError> {
        let mut best: Option<DataTrack> = None;

        for track in self.tracks.iter().filter(|track| track.is_data) {
            let size = fs::metadata(&track.path)
                .map_err(|source| DiscSheetError::TrackFile {
                    path: track.path.clone(),
                    source,
                })?
                .len();
            if best.as_ref().map_or(true, |best| size > best.size) {
                best = Some(DataTrack {
                    path: track.path.clone(),
                    offset: 0,
                    size,
                    sector_size: track.sector_size,
                });
            }
        }

        best.ok_or(DiscSheetError::NoDataTrack(KIND))
    }
}

/// Locate the largest data track of the sheet at `path`
pub fn largest_data_track(path: &Path) -> Result<DataTrack, DiscSheetError> {
    GdiSheet::load(path)?.largest_data_track()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHEET: &str = "3\n\
                         1 0 4 2352 track01.bin 0\n\
                         2 756 0 2352 \"track 02.raw\" 0\n\
                         3 45000 4 2352 track03.bin 0\n";

    #[test]
    fn test_parse_sheet() {
        let sheet = GdiSheet::parse(SHEET, Path::new("/gd")).unwrap();
        assert_eq!(sheet.tracks.len(), 3);
        assert!(sheet.tracks[0].is_data);
        assert!(!sheet.tracks[1].is_data);
        assert_eq!(sheet.tracks[1].path, PathBuf::from("/gd/track 02.raw"));
        assert_eq!(sheet.tracks[2].lba, 45000);
    }

    #[test]
    fn test_count_mismatch() {
        let err = GdiSheet::parse("2\n1 0 4 2352 track01.bin 0\n", Path::new("")).unwrap_err();
        assert!(matches!(err, DiscSheetError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_huge_track_count() {
        let err = GdiSheet::parse("4294967295\n1 0 4 2352 track01.bin 0\n", Path::new("")).unwrap_err();
        assert!(matches!(err, DiscSheetError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_bad_track_type() {
        let err = GdiSheet::parse("1\n1 0 7 2352 track01.bin 0\n", Path::new("")).unwrap_err();
        assert!(matches!(err, DiscSheetError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_largest_data_track() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("track01.bin"), vec![0u8; 2352 * 4]).unwrap();
        fs::write(dir.path().join("track 02.raw"), vec![0u8; 2352 * 64]).unwrap();
        fs::write(dir.path().join("track03.bin"), vec![0u8; 2352 * 16]).unwrap();
        let sheet_path = dir.path().join("disc.gdi");
        fs::write(&sheet_path, SHEET).unwrap();

        let track = largest_data_track(&sheet_path).unwrap();
        assert_eq!(track.path, dir.path().join("track03.bin"));
        assert_eq!(track.size, 2352 * 16);
        assert_eq!(track.offset, 0);
    }
}

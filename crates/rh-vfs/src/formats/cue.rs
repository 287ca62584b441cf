//! CUE sheet parsing
//!
//! Only `FILE`, `TRACK` and `INDEX 01` records matter for locating data
//! tracks. Everything else (`REM`, `PREGAP`, `FLAGS`, ...) is skipped.

use super::{tokenize, DataTrack};
use rh_core::error::DiscSheetError;
use std::fs;
use std::path::{Path, PathBuf};

const KIND: &str = "CUE";

/// Frames (sectors) per second of CD audio time
const FRAMES_PER_SECOND: u64 = 75;

/// Track storage mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    Audio,
    Mode1_2048,
    Mode1_2352,
    Mode2_2336,
    Mode2_2352,
}

impl TrackMode {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "AUDIO" => Some(Self::Audio),
            "MODE1/2048" => Some(Self::Mode1_2048),
            "MODE1/2352" => Some(Self::Mode1_2352),
            "MODE2/2336" => Some(Self::Mode2_2336),
            "MODE2/2352" => Some(Self::Mode2_2352),
            _ => None,
        }
    }

    pub fn sector_size(self) -> u32 {
        match self {
            Self::Audio | Self::Mode1_2352 | Self::Mode2_2352 => 2352,
            Self::Mode1_2048 => 2048,
            Self::Mode2_2336 => 2336,
        }
    }

    pub fn is_data(self) -> bool {
        self != Self::Audio
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueTrack {
    pub number: u32,
    pub mode: TrackMode,
    /// Start of `INDEX 01` in frames from the beginning of the file
    pub start_frame: u64,
}

impl CueTrack {
    pub fn offset(&self) -> u64 {
        self.start_frame.saturating_mul(u64::from(self.mode.sector_size()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueFile {
    pub path: PathBuf,
    pub tracks: Vec<CueTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CueSheet {
    pub files: Vec<CueFile>,
}

fn malformed(line: usize, reason: impl Into<String>) -> DiscSheetError {
    DiscSheetError::Malformed {
        kind: KIND,
        line,
        reason: reason.into(),
    }
}

/// Parse `mm:ss:ff` into a frame count
fn parse_msf(token: &str) -> Option<u64> {
    let mut parts = token.split(':').map(|part| part.parse::<u64>().ok());
    let (minutes, seconds, frames) = (parts.next()??, parts.next()??, parts.next()??);
    if parts.next().is_some() || seconds >= 60 || frames >= FRAMES_PER_SECOND {
        return None;
    }
    minutes
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(FRAMES_PER_SECOND)?
        .checked_add(frames)
}

impl CueSheet {
    /// Parse sheet text; `FILE` entries are resolved against `base_dir`
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, DiscSheetError> {
        let mut sheet = CueSheet::default();
        // Tracks seen without INDEX 01 yet, by line number
        let mut open_track: Option<(usize, u32, TrackMode)> = None;

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let tokens = tokenize(line);
            let Some(command) = tokens.first() else {
                continue;
            };

            match command.to_ascii_uppercase().as_str() {
                "FILE" => {
                    if let Some((line, number, _)) = open_track.take() {
                        return Err(malformed(line, format!("track {} has no INDEX 01", number)));
                    }
                    let name = tokens
                        .get(1)
                        .filter(|name| !name.is_empty())
                        .ok_or_else(|| malformed(line_no, "FILE without a file name"))?;
                    sheet.files.push(CueFile {
                        path: base_dir.join(name),
                        tracks: Vec::new(),
                    });
                }
                "TRACK" => {
                    if sheet.files.is_empty() {
                        return Err(malformed(line_no, "TRACK before any FILE"));
                    }
                    if let Some((line, number, _)) = open_track.take() {
                        return Err(malformed(line, format!("track {} has no INDEX 01", number)));
                    }
                    let number = tokens
                        .get(1)
                        .and_then(|n| n.parse::<u32>().ok())
                        .ok_or_else(|| malformed(line_no, "invalid track number"))?;
                    let mode = tokens
                        .get(2)
                        .and_then(|mode| TrackMode::parse(mode))
                        .ok_or_else(|| malformed(line_no, "unknown track mode"))?;
                    open_track = Some((line_no, number, mode));
                }
                "INDEX" => {
                    let is_start = tokens.get(1).and_then(|n| n.parse::<u32>().ok()) == Some(1);
                    if !is_start {
                        continue;
                    }
                    let (_, number, mode) = open_track
                        .take()
                        .ok_or_else(|| malformed(line_no, "INDEX outside of a TRACK"))?;
                    let start_frame = tokens
                        .get(2)
                        .and_then(|msf| parse_msf(msf))
                        .ok_or_else(|| malformed(line_no, "invalid INDEX time"))?;
                    if start_frame.checked_mul(u64::from(mode.sector_size())).is_none() {
                        return Err(malformed(line_no, "INDEX time out of range"));
                    }
                    if let Some(file) = sheet.files.last_mut() {
                        file.tracks.push(CueTrack {
                            number,
                            mode,
                            start_frame,
                        });
                    }
                }
                _ => {}
            }
        }

        if let Some((line, number, _)) = open_track {
            return Err(malformed(line, format!("track {} has no INDEX 01", number)));
        }

        Ok(sheet)
    }

    pub fn load(path: &Path) -> Result<Self, DiscSheetError> {
        let text = fs::read_to_string(path).map_err(|source| DiscSheetError::TrackFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path.parent().unwrap_or(Path::new("")))
    }

    /// Data tracks with their byte extents
    ///
    /// A track runs to the next track in the same file, or to the end of the
    /// file for the last one.
    pub fn data_tracks(&self) -> Result<Vec<DataTrack>, DiscSheetError> {
        let mut tracks = Vec::new();

        for file in &self.files {
            if !file.tracks.iter().any(|track| track.mode.is_data()) {
                continue;
            }
            let file_size = fs::metadata(&file.path)
                .map_err(|source| DiscSheetError::TrackFile {
                    path: file.path.clone(),
                    source,
                })?
                .len();

            for (i, track) in file.tracks.iter().enumerate() {
                if !track.mode.is_data() {
                    continue;
                }
                let offset = track.offset();
                let end = file.tracks.get(i + 1).map_or(file_size, CueTrack::offset);
                tracks.push(DataTrack {
                    path: file.path.clone(),
                    offset,
                    size: end.min(file_size).saturating_sub(offset),
                    sector_size: track.mode.sector_size(),
                });
            }
        }

        Ok(tracks)
    }

    /// The largest data track; the first one wins ties
    pub fn largest_data_track(&self) -> Result<DataTrack, DiscSheetError> {
        self.data_tracks()?
            .into_iter()
            .reduce(|best, track| if track.size > best.size { track } else { best })
            .ok_or(DiscSheetError::NoDataTrack(KIND))
    }
}

/// Locate the largest data track of the sheet at `path`
pub fn largest_data_track(path: &Path) -> Result<DataTrack, DiscSheetError> {
    CueSheet::load(path)?.largest_data_track()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_msf() {
        assert_eq!(parse_msf("00:00:00"), Some(0));
        assert_eq!(parse_msf("00:02:00"), Some(150));
        assert_eq!(parse_msf("01:00:74"), Some(60 * 75 + 74));
        assert_eq!(parse_msf("00:60:00"), None);
        assert_eq!(parse_msf("00:00"), None);
        assert_eq!(parse_msf("aa:00:00"), None);
        assert_eq!(parse_msf("1000000000000000000:00:00"), None);
    }

    #[test]
    fn test_parse_sheet() {
        let text = "REM GENRE Platformer\n\
                    FILE \"Game (Track 1).bin\" BINARY\n\
                    \x20 TRACK 01 MODE2/2352\n\
                    \x20   INDEX 01 00:00:00\n\
                    \x20 TRACK 02 AUDIO\n\
                    \x20   INDEX 00 00:10:00\n\
                    \x20   INDEX 01 00:12:00\n";
        let sheet = CueSheet::parse(text, Path::new("/discs")).unwrap();
        assert_eq!(sheet.files.len(), 1);
        assert_eq!(sheet.files[0].path, PathBuf::from("/discs/Game (Track 1).bin"));
        let tracks = &sheet.files[0].tracks;
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].mode, TrackMode::Mode2_2352);
        assert_eq!(tracks[1].mode, TrackMode::Audio);
        assert_eq!(tracks[1].start_frame, 12 * 75);
    }

    #[test]
    fn test_malformed_sheets() {
        let base = Path::new("");
        assert!(matches!(
            CueSheet::parse("TRACK 01 MODE1/2352\n", base),
            Err(DiscSheetError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            CueSheet::parse("FILE a.bin BINARY\nTRACK 01 CDG\n", base),
            Err(DiscSheetError::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            CueSheet::parse("FILE a.bin BINARY\nTRACK 01 MODE1/2048\n", base),
            Err(DiscSheetError::Malformed { line: 2, .. })
        ));
    }

    #[test]
    fn test_index_time_overflow() {
        let huge = "FILE a.bin BINARY\nTRACK 01 MODE1/2352\nINDEX 01 1000000000000000000:00:00\n";
        assert!(matches!(
            CueSheet::parse(huge, Path::new("/")),
            Err(DiscSheetError::Malformed { line: 3, .. })
        ));

        // Fits in frames but not once scaled to bytes
        let minutes = u64::MAX / 75 / 60 / 2048;
        let scaled = format!("FILE a.bin BINARY\nTRACK 01 MODE1/2352\nINDEX 01 {}:00:00\n", minutes);
        assert!(matches!(
            CueSheet::parse(&scaled, Path::new("/")),
            Err(DiscSheetError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn test_largest_track_in_single_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("disc.bin"), vec![0u8; 2352 * 100]).unwrap();
        let sheet_path = dir.path().join("disc.cue");
        fs::write(
            &sheet_path,
            "FILE \"disc.bin\" BINARY\n\
             TRACK 01 MODE1/2352\nINDEX 01 00:00:00\n\
             TRACK 02 AUDIO\nINDEX 01 00:00:40\n",
        )
        .unwrap();

        let track = largest_data_track(&sheet_path).unwrap();
        assert_eq!(track.path, dir.path().join("disc.bin"));
        assert_eq!(track.offset, 0);
        assert_eq!(track.size, 40 * 2352);
        assert_eq!(track.sector_size, 2352);
    }

    #[test]
    fn test_largest_track_across_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("t1.bin"), vec![0u8; 2352 * 10]).unwrap();
        fs::write(dir.path().join("t2.bin"), vec![0u8; 2352 * 50]).unwrap();
        fs::write(dir.path().join("t3.bin"), vec![0u8; 2048 * 30]).unwrap();
        let sheet_path = dir.path().join("disc.cue");
        fs::write(
            &sheet_path,
            "FILE t1.bin BINARY\nTRACK 01 MODE2/2352\nINDEX 01 00:00:00\n\
             FILE t2.bin BINARY\nTRACK 02 AUDIO\nINDEX 01 00:00:00\n\
             FILE t3.bin BINARY\nTRACK 03 MODE1/2048\nINDEX 01 00:00:00\n",
        )
        .unwrap();

        let track = largest_data_track(&sheet_path).unwrap();
        assert_eq!(track.path, dir.path().join("t3.bin"));
        assert_eq!(track.size, 2048 * 30);
    }

    #[test]
    fn test_audio_only_disc() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cd.bin"), vec![0u8; 2352]).unwrap();
        let sheet_path = dir.path().join("cd.cue");
        fs::write(&sheet_path, "FILE cd.bin BINARY\nTRACK 01 AUDIO\nINDEX 01 00:00:00\n").unwrap();

        assert!(matches!(
            largest_data_track(&sheet_path),
            Err(DiscSheetError::NoDataTrack("CUE"))
        ));
    }

    #[test]
    fn test_missing_track_file() {
        let dir = TempDir::new().unwrap();
        let sheet_path = dir.path().join("disc.cue");
        fs::write(&sheet_path, "FILE gone.bin BINARY\nTRACK 01 MODE1/2352\nINDEX 01 00:00:00\n").unwrap();

        assert!(matches!(
            largest_data_track(&sheet_path),
            Err(DiscSheetError::TrackFile { .. })
        ));
    }
}

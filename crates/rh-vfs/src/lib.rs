//! Content access for retrohost
//!
//! Content paths, zip archives, CUE/GDI disc sheets and the sandbox policy
//! that decides when content must be copied before a core can open it.

pub mod archive;
pub mod content_path;
pub mod formats;
pub mod sandbox;

pub use archive::Archive;
pub use content_path::{ContentKind, ContentPath, DiscSheet, MediaKind};
pub use formats::DataTrack;
pub use sandbox::{copy_to_cache, SandboxPolicy};

use rh_core::error::DiscSheetError;
use std::path::Path;

/// Largest data track referenced by a disc sheet
pub fn largest_data_track(sheet: DiscSheet, path: &Path) -> Result<DataTrack, DiscSheetError> {
    match sheet {
        DiscSheet::Cue => formats::cue::largest_data_track(path),
        DiscSheet::Gdi => formats::gdi::largest_data_track(path),
    }
}

//! Safe core interface
//!
//! [`CoreBinding`] is the narrow seam between the content runtime and a
//! core. [`crate::DynamicCore`] implements it over a loaded shared library;
//! tests implement it with in-process spies.

use crate::abi;
use bitflags::bitflags;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Static information a core reports about itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub library_name: String,
    pub library_version: String,
    /// Lowercase extensions without the leading dot
    pub valid_extensions: Vec<String>,
    /// The core reads content from disk itself
    pub need_fullpath: bool,
    /// The core handles archives on its own
    pub block_extract: bool,
}

impl SystemInfo {
    /// Check whether the core lists `extension` as loadable
    pub fn accepts_extension(&self, extension: &str) -> bool {
        extension_in(&self.valid_extensions, extension)
    }
}

/// Split a `|`-separated extension list into normalized entries
pub fn parse_extension_list(list: &str) -> Vec<String> {
    list.split('|')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// Case-insensitive membership test against a parsed extension list
pub fn extension_in(extensions: &[String], extension: &str) -> bool {
    let extension = extension.trim_start_matches('.');
    extensions.iter().any(|ext| ext.eq_ignore_ascii_case(extension))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GameGeometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub aspect_ratio: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemTiming {
    pub fps: f64,
    pub sample_rate: f64,
}

/// Audio/video parameters, valid once content is loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemAvInfo {
    pub geometry: GameGeometry,
    pub timing: SystemTiming,
}

impl From<abi::retro_system_av_info> for SystemAvInfo {
    fn from(raw: abi::retro_system_av_info) -> Self {
        Self {
            geometry: GameGeometry {
                base_width: raw.geometry.base_width,
                base_height: raw.geometry.base_height,
                max_width: raw.geometry.max_width,
                max_height: raw.geometry.max_height,
                aspect_ratio: raw.geometry.aspect_ratio,
            },
            timing: SystemTiming {
                fps: raw.timing.fps,
                sample_rate: raw.timing.sample_rate,
            },
        }
    }
}

/// Extra memory a subsystem content slot exposes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubsystemMemory {
    pub extension: String,
    pub memory_type: u32,
}

/// Requirements for one content slot of a subsystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubsystemRom {
    pub desc: String,
    pub valid_extensions: Vec<String>,
    pub need_fullpath: bool,
    pub block_extract: bool,
    pub required: bool,
    pub memory: Vec<SubsystemMemory>,
}

/// A named bundle of content loaded through `load_game_special`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubsystemDescriptor {
    /// Machine name, matched against `--subsystem`
    pub ident: String,
    /// Friendly name
    pub desc: String,
    /// Value passed as `game_type` to `load_game_special`
    pub id: u32,
    pub roms: Vec<SubsystemRom>,
}

impl SubsystemDescriptor {
    /// Number of content files the core expects
    pub fn num_roms(&self) -> usize {
        self.roms.len()
    }
}

bitflags! {
    /// Save-state behaviour a core reports through `SET_SERIALIZATION_QUIRKS`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SerializationQuirks: u64 {
        const INCOMPLETE = abi::RETRO_SERIALIZATION_QUIRK_INCOMPLETE;
        const MUST_INITIALIZE = abi::RETRO_SERIALIZATION_QUIRK_MUST_INITIALIZE;
        const CORE_VARIABLE_SIZE = abi::RETRO_SERIALIZATION_QUIRK_CORE_VARIABLE_SIZE;
        const FRONT_VARIABLE_SIZE = abi::RETRO_SERIALIZATION_QUIRK_FRONT_VARIABLE_SIZE;
        const SINGLE_SESSION = abi::RETRO_SERIALIZATION_QUIRK_SINGLE_SESSION;
        const ENDIAN_DEPENDENT = abi::RETRO_SERIALIZATION_QUIRK_ENDIAN_DEPENDENT;
        const PLATFORM_DEPENDENT = abi::RETRO_SERIALIZATION_QUIRK_PLATFORM_DEPENDENT;
    }
}

/// Video region reported by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Region {
    Ntsc,
    Pal,
    Unknown(u32),
}

impl From<u32> for Region {
    fn from(value: u32) -> Self {
        match value {
            abi::RETRO_REGION_NTSC => Self::Ntsc,
            abi::RETRO_REGION_PAL => Self::Pal,
            other => Self::Unknown(other),
        }
    }
}

/// Memory regions a core may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryType {
    SaveRam,
    Rtc,
    SystemRam,
    VideoRam,
}

impl MemoryType {
    pub fn as_raw(self) -> u32 {
        match self {
            Self::SaveRam => abi::RETRO_MEMORY_SAVE_RAM,
            Self::Rtc => abi::RETRO_MEMORY_RTC,
            Self::SystemRam => abi::RETRO_MEMORY_SYSTEM_RAM,
            Self::VideoRam => abi::RETRO_MEMORY_VIDEO_RAM,
        }
    }
}

/// Framebuffer format selected through `SET_PIXEL_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Rgb1555,
    Xrgb8888,
    Rgb565,
}

impl PixelFormat {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            abi::RETRO_PIXEL_FORMAT_0RGB1555 => Some(Self::Rgb1555),
            abi::RETRO_PIXEL_FORMAT_XRGB8888 => Some(Self::Xrgb8888),
            abi::RETRO_PIXEL_FORMAT_RGB565 => Some(Self::Rgb565),
            _ => None,
        }
    }
}

/// One content item as handed to `load_game`/`load_game_special`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameInfo {
    pub path: Option<PathBuf>,
    pub data: Option<Vec<u8>>,
    pub meta: Option<String>,
}

impl GameInfo {
    /// Content the core opens itself
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Content already read into memory
    pub fn from_data(path: Option<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path,
            data: Some(data),
            meta: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// No path and no data: a slot left empty on purpose
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.data.is_none()
    }
}

/// Audio/video/input callbacks supplied by the driver collaborators
#[derive(Clone, Copy)]
pub struct Callbacks {
    pub video_refresh: abi::retro_video_refresh_t,
    pub audio_sample: abi::retro_audio_sample_t,
    pub audio_sample_batch: abi::retro_audio_sample_batch_t,
    pub input_poll: abi::retro_input_poll_t,
    pub input_state: abi::retro_input_state_t,
}

impl Callbacks {
    /// Callbacks that discard output and report no input
    pub fn headless() -> Self {
        Self {
            video_refresh: headless_video_refresh,
            audio_sample: headless_audio_sample,
            audio_sample_batch: headless_audio_sample_batch,
            input_poll: headless_input_poll,
            input_state: headless_input_state,
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

unsafe extern "C" fn headless_video_refresh(
    _data: *const libc::c_void,
    _width: libc::c_uint,
    _height: libc::c_uint,
    _pitch: libc::size_t,
) {
}

unsafe extern "C" fn headless_audio_sample(_left: i16, _right: i16) {}

unsafe extern "C" fn headless_audio_sample_batch(_data: *const i16, frames: libc::size_t) -> libc::size_t {
    frames
}

unsafe extern "C" fn headless_input_poll() {}

unsafe extern "C" fn headless_input_state(
    _port: libc::c_uint,
    _device: libc::c_uint,
    _index: libc::c_uint,
    _id: libc::c_uint,
) -> i16 {
    0
}

/// Everything a core declared through the environment callback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreDeclarations {
    /// `SET_SUPPORT_NO_GAME`: an empty content path is a valid load
    pub supports_no_game: bool,
    pub subsystems: Vec<SubsystemDescriptor>,
    pub has_set_subsystems: bool,
    pub has_set_input_descriptors: bool,
    pub quirks: SerializationQuirks,
    /// The core obtained the frontend VFS interface
    pub supports_vfs: bool,
    pub pixel_format: PixelFormat,
    pub rotation: u32,
    pub performance_level: u32,
    pub shutdown_requested: bool,
}

/// Operations the content runtime needs from a core
pub trait CoreBinding {
    fn api_version(&self) -> u32;
    fn init(&mut self);
    fn deinit(&mut self);
    fn system_info(&self) -> SystemInfo;
    fn system_av_info(&self) -> SystemAvInfo;
    fn declarations(&self) -> CoreDeclarations;

    /// Drain on-screen messages the core pushed since the last call
    fn take_messages(&mut self) -> Vec<String> {
        Vec::new()
    }

    fn set_callbacks(&mut self, callbacks: &Callbacks);
    fn set_controller_port_device(&mut self, port: u32, device: u32);
    fn reset(&mut self);
    fn run(&mut self);
    fn serialize_size(&mut self) -> usize;
    fn serialize(&mut self, buf: &mut [u8]) -> bool;
    fn unserialize(&mut self, buf: &[u8]) -> bool;
    fn cheat_reset(&mut self);
    fn cheat_set(&mut self, index: u32, enabled: bool, code: &str);

    /// `None` loads without content (`SET_SUPPORT_NO_GAME` cores)
    fn load_game(&mut self, game: Option<&GameInfo>) -> bool;
    fn load_game_special(&mut self, game_type: u32, games: &[GameInfo]) -> bool;
    fn unload_game(&mut self);
    fn region(&self) -> Region;
    fn memory(&mut self, id: MemoryType) -> Option<&mut [u8]>;
}

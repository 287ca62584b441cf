//! Raw core ABI
//!
//! `#[repr(C)]` mirrors of the structures, callback typedefs and constants
//! exchanged with a core. Nothing outside this crate touches these directly.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_uint, c_void, size_t};

/// The only API revision this frontend speaks
pub const RETRO_API_VERSION: c_uint = 1;

/// Environment command ids
pub mod env {
    use libc::c_uint;

    pub const EXPERIMENTAL: c_uint = 0x10000;

    pub const SET_ROTATION: c_uint = 1;
    pub const GET_OVERSCAN: c_uint = 2;
    pub const GET_CAN_DUPE: c_uint = 3;
    pub const SET_MESSAGE: c_uint = 6;
    pub const SHUTDOWN: c_uint = 7;
    pub const SET_PERFORMANCE_LEVEL: c_uint = 8;
    pub const GET_SYSTEM_DIRECTORY: c_uint = 9;
    pub const SET_PIXEL_FORMAT: c_uint = 10;
    pub const SET_INPUT_DESCRIPTORS: c_uint = 11;
    pub const GET_VARIABLE: c_uint = 15;
    pub const SET_VARIABLES: c_uint = 16;
    pub const GET_VARIABLE_UPDATE: c_uint = 17;
    pub const SET_SUPPORT_NO_GAME: c_uint = 18;
    pub const GET_LIBRETRO_PATH: c_uint = 19;
    pub const GET_LOG_INTERFACE: c_uint = 27;
    pub const GET_SAVE_DIRECTORY: c_uint = 31;
    pub const SET_SYSTEM_AV_INFO: c_uint = 32;
    pub const SET_SUBSYSTEM_INFO: c_uint = 34;
    pub const SET_CONTROLLER_INFO: c_uint = 35;
    pub const SET_GEOMETRY: c_uint = 37;
    pub const GET_USERNAME: c_uint = 38;
    pub const GET_LANGUAGE: c_uint = 39;
    pub const SET_SERIALIZATION_QUIRKS: c_uint = 44;
    pub const GET_VFS_INTERFACE: c_uint = 45 | EXPERIMENTAL;
}

/// Memory region ids for `retro_get_memory_*`
pub const RETRO_MEMORY_SAVE_RAM: c_uint = 0;
pub const RETRO_MEMORY_RTC: c_uint = 1;
pub const RETRO_MEMORY_SYSTEM_RAM: c_uint = 2;
pub const RETRO_MEMORY_VIDEO_RAM: c_uint = 3;

/// Region ids returned by `retro_get_region`
pub const RETRO_REGION_NTSC: c_uint = 0;
pub const RETRO_REGION_PAL: c_uint = 1;

/// Pixel formats accepted by `SET_PIXEL_FORMAT`
pub const RETRO_PIXEL_FORMAT_0RGB1555: c_uint = 0;
pub const RETRO_PIXEL_FORMAT_XRGB8888: c_uint = 1;
pub const RETRO_PIXEL_FORMAT_RGB565: c_uint = 2;

/// Language reported through `GET_LANGUAGE`
pub const RETRO_LANGUAGE_ENGLISH: c_uint = 0;

/// Serialization quirk bits
pub const RETRO_SERIALIZATION_QUIRK_INCOMPLETE: u64 = 1 << 0;
pub const RETRO_SERIALIZATION_QUIRK_MUST_INITIALIZE: u64 = 1 << 1;
pub const RETRO_SERIALIZATION_QUIRK_CORE_VARIABLE_SIZE: u64 = 1 << 2;
pub const RETRO_SERIALIZATION_QUIRK_FRONT_VARIABLE_SIZE: u64 = 1 << 3;
pub const RETRO_SERIALIZATION_QUIRK_SINGLE_SESSION: u64 = 1 << 4;
pub const RETRO_SERIALIZATION_QUIRK_ENDIAN_DEPENDENT: u64 = 1 << 5;
pub const RETRO_SERIALIZATION_QUIRK_PLATFORM_DEPENDENT: u64 = 1 << 6;

/// VFS interface revision implemented by [`crate::vfs`]
pub const RETRO_VFS_INTERFACE_VERSION: u32 = 2;

pub const RETRO_VFS_FILE_ACCESS_READ: c_uint = 1 << 0;
pub const RETRO_VFS_FILE_ACCESS_WRITE: c_uint = 1 << 1;
pub const RETRO_VFS_FILE_ACCESS_READ_WRITE: c_uint =
    RETRO_VFS_FILE_ACCESS_READ | RETRO_VFS_FILE_ACCESS_WRITE;
pub const RETRO_VFS_FILE_ACCESS_UPDATE_EXISTING: c_uint = 1 << 2;

pub const RETRO_VFS_SEEK_POSITION_START: c_int = 0;
pub const RETRO_VFS_SEEK_POSITION_CURRENT: c_int = 1;
pub const RETRO_VFS_SEEK_POSITION_END: c_int = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_system_info {
    pub library_name: *const c_char,
    pub library_version: *const c_char,
    pub valid_extensions: *const c_char,
    pub need_fullpath: bool,
    pub block_extract: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct retro_game_geometry {
    pub base_width: c_uint,
    pub base_height: c_uint,
    pub max_width: c_uint,
    pub max_height: c_uint,
    pub aspect_ratio: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct retro_system_timing {
    pub fps: f64,
    pub sample_rate: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct retro_system_av_info {
    pub geometry: retro_game_geometry,
    pub timing: retro_system_timing,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_game_info {
    pub path: *const c_char,
    pub data: *const c_void,
    pub size: size_t,
    pub meta: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_subsystem_memory_info {
    pub extension: *const c_char,
    pub type_: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_subsystem_rom_info {
    pub desc: *const c_char,
    pub valid_extensions: *const c_char,
    pub need_fullpath: bool,
    pub block_extract: bool,
    pub required: bool,
    pub memory: *const retro_subsystem_memory_info,
    pub num_memory: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_subsystem_info {
    pub desc: *const c_char,
    pub ident: *const c_char,
    pub roms: *const retro_subsystem_rom_info,
    pub num_roms: c_uint,
    pub id: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_message {
    pub msg: *const c_char,
    pub frames: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct retro_variable {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// Opaque file handle handed to cores through the VFS interface
#[repr(C)]
pub struct retro_vfs_file_handle {
    _private: [u8; 0],
}

pub type retro_vfs_get_path_t =
    unsafe extern "C" fn(stream: *mut retro_vfs_file_handle) -> *const c_char;
pub type retro_vfs_open_t =
    unsafe extern "C" fn(path: *const c_char, mode: c_uint, hints: c_uint) -> *mut retro_vfs_file_handle;
pub type retro_vfs_close_t = unsafe extern "C" fn(stream: *mut retro_vfs_file_handle) -> c_int;
pub type retro_vfs_size_t = unsafe extern "C" fn(stream: *mut retro_vfs_file_handle) -> i64;
pub type retro_vfs_tell_t = unsafe extern "C" fn(stream: *mut retro_vfs_file_handle) -> i64;
pub type retro_vfs_seek_t =
    unsafe extern "C" fn(stream: *mut retro_vfs_file_handle, offset: i64, seek_position: c_int) -> i64;
pub type retro_vfs_read_t =
    unsafe extern "C" fn(stream: *mut retro_vfs_file_handle, s: *mut c_void, len: u64) -> i64;
pub type retro_vfs_write_t =
    unsafe extern "C" fn(stream: *mut retro_vfs_file_handle, s: *const c_void, len: u64) -> i64;
pub type retro_vfs_flush_t = unsafe extern "C" fn(stream: *mut retro_vfs_file_handle) -> c_int;
pub type retro_vfs_remove_t = unsafe extern "C" fn(path: *const c_char) -> c_int;
pub type retro_vfs_rename_t =
    unsafe extern "C" fn(old_path: *const c_char, new_path: *const c_char) -> c_int;
pub type retro_vfs_truncate_t =
    unsafe extern "C" fn(stream: *mut retro_vfs_file_handle, length: i64) -> i64;

/// Version 2 of the VFS interface (version 1 plus `truncate`)
#[repr(C)]
pub struct retro_vfs_interface {
    pub get_path: retro_vfs_get_path_t,
    pub open: retro_vfs_open_t,
    pub close: retro_vfs_close_t,
    pub size: retro_vfs_size_t,
    pub tell: retro_vfs_tell_t,
    pub seek: retro_vfs_seek_t,
    pub read: retro_vfs_read_t,
    pub write: retro_vfs_write_t,
    pub flush: retro_vfs_flush_t,
    pub remove: retro_vfs_remove_t,
    pub rename: retro_vfs_rename_t,
    pub truncate: retro_vfs_truncate_t,
}

#[repr(C)]
pub struct retro_vfs_interface_info {
    pub required_interface_version: u32,
    pub iface: *const retro_vfs_interface,
}

// Frontend callbacks handed to the core
pub type retro_environment_t = unsafe extern "C" fn(cmd: c_uint, data: *mut c_void) -> bool;
pub type retro_video_refresh_t =
    unsafe extern "C" fn(data: *const c_void, width: c_uint, height: c_uint, pitch: size_t);
pub type retro_audio_sample_t = unsafe extern "C" fn(left: i16, right: i16);
pub type retro_audio_sample_batch_t = unsafe extern "C" fn(data: *const i16, frames: size_t) -> size_t;
pub type retro_input_poll_t = unsafe extern "C" fn();
pub type retro_input_state_t =
    unsafe extern "C" fn(port: c_uint, device: c_uint, index: c_uint, id: c_uint) -> i16;

// Core entry points
pub type RetroSetEnvironmentFn = unsafe extern "C" fn(retro_environment_t);
pub type RetroSetVideoRefreshFn = unsafe extern "C" fn(retro_video_refresh_t);
pub type RetroSetAudioSampleFn = unsafe extern "C" fn(retro_audio_sample_t);
pub type RetroSetAudioSampleBatchFn = unsafe extern "C" fn(retro_audio_sample_batch_t);
pub type RetroSetInputPollFn = unsafe extern "C" fn(retro_input_poll_t);
pub type RetroSetInputStateFn = unsafe extern "C" fn(retro_input_state_t);
pub type RetroInitFn = unsafe extern "C" fn();
pub type RetroDeinitFn = unsafe extern "C" fn();
pub type RetroApiVersionFn = unsafe extern "C" fn() -> c_uint;
pub type RetroGetSystemInfoFn = unsafe extern "C" fn(info: *mut retro_system_info);
pub type RetroGetSystemAvInfoFn = unsafe extern "C" fn(info: *mut retro_system_av_info);
pub type RetroSetControllerPortDeviceFn = unsafe extern "C" fn(port: c_uint, device: c_uint);
pub type RetroResetFn = unsafe extern "C" fn();
pub type RetroRunFn = unsafe extern "C" fn();
pub type RetroSerializeSizeFn = unsafe extern "C" fn() -> size_t;
pub type RetroSerializeFn = unsafe extern "C" fn(data: *mut c_void, size: size_t) -> bool;
pub type RetroUnserializeFn = unsafe extern "C" fn(data: *const c_void, size: size_t) -> bool;
pub type RetroCheatResetFn = unsafe extern "C" fn();
pub type RetroCheatSetFn = unsafe extern "C" fn(index: c_uint, enabled: bool, code: *const c_char);
pub type RetroLoadGameFn = unsafe extern "C" fn(game: *const retro_game_info) -> bool;
pub type RetroLoadGameSpecialFn =
    unsafe extern "C" fn(game_type: c_uint, info: *const retro_game_info, num_info: size_t) -> bool;
pub type RetroUnloadGameFn = unsafe extern "C" fn();
pub type RetroGetRegionFn = unsafe extern "C" fn() -> c_uint;
pub type RetroGetMemoryDataFn = unsafe extern "C" fn(id: c_uint) -> *mut c_void;
pub type RetroGetMemorySizeFn = unsafe extern "C" fn(id: c_uint) -> size_t;

//! Environment callback
//!
//! Cores talk back to the frontend through a single C callback that carries
//! no user data, so the state it reads and writes is process-wide. The state
//! is reset every time a core is opened and cleared when it is dropped.

use crate::abi::{self, env};
use crate::binding::{
    parse_extension_list, CoreDeclarations, PixelFormat, SerializationQuirks,
    SubsystemDescriptor, SubsystemMemory, SubsystemRom,
};
use crate::vfs;
use libc::{c_char, c_uint, c_void};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::ffi::{CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::{debug, info, warn};

/// Directories and identity the frontend exposes to cores
#[derive(Debug, Clone, Default)]
pub struct FrontendPaths {
    pub system_dir: PathBuf,
    pub save_dir: PathBuf,
    pub username: String,
}

#[derive(Default)]
struct EnvironmentState {
    declarations: CoreDeclarations,
    messages: Vec<String>,
    // Handed out by pointer, so they live here until the next reset.
    core_path: Option<CString>,
    system_dir: Option<CString>,
    save_dir: Option<CString>,
    username: Option<CString>,
    /// Only answer what a subsystem peek needs
    peek_only: bool,
}

static ENVIRONMENT: Lazy<Mutex<EnvironmentState>> =
    Lazy::new(|| Mutex::new(EnvironmentState::default()));

fn path_cstring(path: &Path) -> Option<CString> {
    CString::new(path.to_string_lossy().into_owned()).ok()
}

/// Start a fresh environment for the core at `core_path`
pub(crate) fn reset(core_path: &Path, paths: &FrontendPaths, peek_only: bool) {
    let mut state = ENVIRONMENT.lock();
    *state = EnvironmentState {
        core_path: path_cstring(core_path),
        system_dir: path_cstring(&paths.system_dir),
        save_dir: path_cstring(&paths.save_dir),
        username: CString::new(paths.username.clone()).ok(),
        peek_only,
        ..EnvironmentState::default()
    };
}

/// Forget everything the last core declared
pub(crate) fn clear() {
    *ENVIRONMENT.lock() = EnvironmentState::default();
}

pub(crate) fn declarations() -> CoreDeclarations {
    ENVIRONMENT.lock().declarations.clone()
}

pub(crate) fn take_messages() -> Vec<String> {
    std::mem::take(&mut ENVIRONMENT.lock().messages)
}

/// Copy a C string, tolerating null and invalid UTF-8
pub(crate) unsafe fn c_string_lossy(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

unsafe fn slice_or_empty<'a, T>(ptr: *const T, len: c_uint) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len as usize)
    }
}

/// Deep-copy a null-ident-terminated `retro_subsystem_info` array
unsafe fn read_subsystems(mut raw: *const abi::retro_subsystem_info) -> Vec<SubsystemDescriptor> {
    let mut subsystems = Vec::new();

    while !(*raw).ident.is_null() {
        let info = &*raw;
        let roms = slice_or_empty(info.roms, info.num_roms)
            .iter()
            .map(|rom| SubsystemRom {
                desc: c_string_lossy(rom.desc).unwrap_or_default(),
                valid_extensions: parse_extension_list(
                    &c_string_lossy(rom.valid_extensions).unwrap_or_default(),
                ),
                need_fullpath: rom.need_fullpath,
                block_extract: rom.block_extract,
                required: rom.required,
                memory: slice_or_empty(rom.memory, rom.num_memory)
                    .iter()
                    .map(|memory| SubsystemMemory {
                        extension: c_string_lossy(memory.extension).unwrap_or_default(),
                        memory_type: memory.type_,
                    })
                    .collect(),
            })
            .collect();

        subsystems.push(SubsystemDescriptor {
            ident: c_string_lossy(info.ident).unwrap_or_default(),
            desc: c_string_lossy(info.desc).unwrap_or_default(),
            id: info.id,
            roms,
        });
        raw = raw.add(1);
    }

    subsystems
}

unsafe fn write_value<T>(data: *mut c_void, value: T) -> bool {
    if data.is_null() {
        return false;
    }
    *(data as *mut T) = value;
    true
}

unsafe fn write_string(data: *mut c_void, value: &Option<CString>) -> bool {
    match value {
        Some(value) if !data.is_null() => {
            *(data as *mut *const c_char) = value.as_ptr();
            true
        }
        _ => false,
    }
}

/// The callback registered with `retro_set_environment`
pub(crate) unsafe extern "C" fn environment_callback(cmd: c_uint, data: *mut c_void) -> bool {
    catch_unwind(AssertUnwindSafe(|| unsafe { handle(cmd, data) })).unwrap_or_else(|_| {
        warn!("Environment command {} panicked", cmd);
        false
    })
}

unsafe fn handle(cmd: c_uint, data: *mut c_void) -> bool {
    let mut state = ENVIRONMENT.lock();

    if state.peek_only && cmd != env::SET_SUBSYSTEM_INFO && cmd != env::SET_SUPPORT_NO_GAME {
        return false;
    }

    match cmd {
        env::SET_ROTATION => {
            if data.is_null() {
                return false;
            }
            state.declarations.rotation = *(data as *const c_uint);
            true
        }
        env::GET_OVERSCAN => write_value(data, false),
        env::GET_CAN_DUPE => write_value(data, true),
        env::SET_MESSAGE => {
            if data.is_null() {
                return false;
            }
            let message = &*(data as *const abi::retro_message);
            if let Some(text) = c_string_lossy(message.msg) {
                info!(frames = message.frames, "Core message: {}", text);
                state.messages.push(text);
            }
            true
        }
        env::SHUTDOWN => {
            info!("Core requested shutdown");
            state.declarations.shutdown_requested = true;
            true
        }
        env::SET_PERFORMANCE_LEVEL => {
            if data.is_null() {
                return false;
            }
            state.declarations.performance_level = *(data as *const c_uint);
            true
        }
        env::GET_SYSTEM_DIRECTORY => write_string(data, &state.system_dir),
        env::GET_SAVE_DIRECTORY => write_string(data, &state.save_dir),
        env::GET_LIBRETRO_PATH => write_string(data, &state.core_path),
        env::GET_USERNAME => write_string(data, &state.username),
        env::SET_PIXEL_FORMAT => {
            if data.is_null() {
                return false;
            }
            match PixelFormat::from_raw(*(data as *const c_uint)) {
                Some(format) => {
                    debug!("Core selected pixel format {:?}", format);
                    state.declarations.pixel_format = format;
                    true
                }
                None => false,
            }
        }
        env::SET_INPUT_DESCRIPTORS => {
            state.declarations.has_set_input_descriptors = true;
            true
        }
        env::GET_VARIABLE => {
            if !data.is_null() {
                (*(data as *mut abi::retro_variable)).value = ptr::null();
            }
            false
        }
        env::SET_VARIABLES => true,
        env::GET_VARIABLE_UPDATE => write_value(data, false),
        env::SET_SUPPORT_NO_GAME => {
            if data.is_null() {
                return false;
            }
            state.declarations.supports_no_game = *(data as *const bool);
            debug!(
                "Core supports running without content: {}",
                state.declarations.supports_no_game
            );
            true
        }
        // Variadic log callbacks cannot be defined in stable Rust.
        env::GET_LOG_INTERFACE => false,
        env::SET_SYSTEM_AV_INFO | env::SET_GEOMETRY | env::SET_CONTROLLER_INFO => true,
        env::SET_SUBSYSTEM_INFO => {
            if data.is_null() {
                return false;
            }
            let subsystems = read_subsystems(data as *const abi::retro_subsystem_info);
            for subsystem in &subsystems {
                debug!(
                    "Subsystem \"{}\" ({}): {} content files",
                    subsystem.ident,
                    subsystem.desc,
                    subsystem.num_roms()
                );
            }
            state.declarations.subsystems = subsystems;
            state.declarations.has_set_subsystems = true;
            true
        }
        env::GET_LANGUAGE => write_value(data, abi::RETRO_LANGUAGE_ENGLISH),
        env::SET_SERIALIZATION_QUIRKS => {
            if data.is_null() {
                return false;
            }
            let quirks = data as *mut u64;
            state.declarations.quirks = SerializationQuirks::from_bits_truncate(*quirks);
            // Sizes are never cached, so variable sizes are fine.
            *quirks |= abi::RETRO_SERIALIZATION_QUIRK_FRONT_VARIABLE_SIZE;
            true
        }
        env::GET_VFS_INTERFACE => {
            if data.is_null() {
                return false;
            }
            let info = &mut *(data as *mut abi::retro_vfs_interface_info);
            if info.required_interface_version > abi::RETRO_VFS_INTERFACE_VERSION {
                debug!(
                    "Core wants VFS v{}, only v{} is available",
                    info.required_interface_version,
                    abi::RETRO_VFS_INTERFACE_VERSION
                );
                return false;
            }
            info.iface = vfs::interface();
            state.declarations.supports_vfs = true;
            true
        }
        _ => {
            debug!("Unhandled environment command {}", cmd);
            false
        }
    }
}

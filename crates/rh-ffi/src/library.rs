//! Cores loaded from shared libraries

use crate::abi::{self, RETRO_API_VERSION};
use crate::binding::{
    Callbacks, CoreBinding, CoreDeclarations, GameInfo, MemoryType, Region, SubsystemDescriptor,
    SystemAvInfo, SystemInfo,
};
use crate::environment::{self, c_string_lossy, FrontendPaths};
use libc::c_void;
use libloading::Library;
use rh_core::error::CoreLoadError;
use serde::Serialize;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::{debug, info, warn};

/// Resolve one entry point by its exact exported name
fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T, CoreLoadError> {
    let symbol: libloading::Symbol<'_, T> =
        unsafe { lib.get(name.as_bytes()) }.map_err(|_| CoreLoadError::MissingSymbol(name))?;
    Ok(*symbol)
}

/// Every entry point a core must export
struct CoreSymbols {
    set_environment: abi::RetroSetEnvironmentFn,
    set_video_refresh: abi::RetroSetVideoRefreshFn,
    set_audio_sample: abi::RetroSetAudioSampleFn,
    set_audio_sample_batch: abi::RetroSetAudioSampleBatchFn,
    set_input_poll: abi::RetroSetInputPollFn,
    set_input_state: abi::RetroSetInputStateFn,
    init: abi::RetroInitFn,
    deinit: abi::RetroDeinitFn,
    api_version: abi::RetroApiVersionFn,
    get_system_info: abi::RetroGetSystemInfoFn,
    get_system_av_info: abi::RetroGetSystemAvInfoFn,
    set_controller_port_device: abi::RetroSetControllerPortDeviceFn,
    reset: abi::RetroResetFn,
    run: abi::RetroRunFn,
    serialize_size: abi::RetroSerializeSizeFn,
    serialize: abi::RetroSerializeFn,
    unserialize: abi::RetroUnserializeFn,
    cheat_reset: abi::RetroCheatResetFn,
    cheat_set: abi::RetroCheatSetFn,
    load_game: abi::RetroLoadGameFn,
    load_game_special: abi::RetroLoadGameSpecialFn,
    unload_game: abi::RetroUnloadGameFn,
    get_region: abi::RetroGetRegionFn,
    get_memory_data: abi::RetroGetMemoryDataFn,
    get_memory_size: abi::RetroGetMemorySizeFn,
}

impl CoreSymbols {
    fn resolve(lib: &Library) -> Result<Self, CoreLoadError> {
        Ok(Self {
            set_environment: symbol(lib, "retro_set_environment")?,
            set_video_refresh: symbol(lib, "retro_set_video_refresh")?,
            set_audio_sample: symbol(lib, "retro_set_audio_sample")?,
            set_audio_sample_batch: symbol(lib, "retro_set_audio_sample_batch")?,
            set_input_poll: symbol(lib, "retro_set_input_poll")?,
            set_input_state: symbol(lib, "retro_set_input_state")?,
            init: symbol(lib, "retro_init")?,
            deinit: symbol(lib, "retro_deinit")?,
            api_version: symbol(lib, "retro_api_version")?,
            get_system_info: symbol(lib, "retro_get_system_info")?,
            get_system_av_info: symbol(lib, "retro_get_system_av_info")?,
            set_controller_port_device: symbol(lib, "retro_set_controller_port_device")?,
            reset: symbol(lib, "retro_reset")?,
            run: symbol(lib, "retro_run")?,
            serialize_size: symbol(lib, "retro_serialize_size")?,
            serialize: symbol(lib, "retro_serialize")?,
            unserialize: symbol(lib, "retro_unserialize")?,
            cheat_reset: symbol(lib, "retro_cheat_reset")?,
            cheat_set: symbol(lib, "retro_cheat_set")?,
            load_game: symbol(lib, "retro_load_game")?,
            load_game_special: symbol(lib, "retro_load_game_special")?,
            unload_game: symbol(lib, "retro_unload_game")?,
            get_region: symbol(lib, "retro_get_region")?,
            get_memory_data: symbol(lib, "retro_get_memory_data")?,
            get_memory_size: symbol(lib, "retro_get_memory_size")?,
        })
    }
}

/// What a core says about itself before anything is initialized
#[derive(Debug, Clone, Serialize)]
pub struct CorePeek {
    pub system_info: SystemInfo,
    pub supports_no_game: bool,
    pub subsystems: Vec<SubsystemDescriptor>,
}

/// A core opened from a shared library
///
/// The environment callback is process-wide, so only one core should be open
/// at a time.
pub struct DynamicCore {
    path: PathBuf,
    symbols: CoreSymbols,
    // Keep library alive while the symbols are in use.
    _library: Library,
}

impl DynamicCore {
    /// Open a core and register the environment callback
    pub fn open(path: &Path, paths: &FrontendPaths) -> Result<Self, CoreLoadError> {
        Self::open_with(path, paths, false)
    }

    /// Read system info and subsystem declarations without initializing the core
    pub fn peek(path: &Path, paths: &FrontendPaths) -> Result<CorePeek, CoreLoadError> {
        let core = Self::open_with(path, paths, true)?;
        let declarations = core.declarations();
        Ok(CorePeek {
            system_info: core.system_info(),
            supports_no_game: declarations.supports_no_game,
            subsystems: declarations.subsystems,
        })
    }

    fn open_with(path: &Path, paths: &FrontendPaths, peek_only: bool) -> Result<Self, CoreLoadError> {
        let library = unsafe { Library::new(path) }.map_err(|e| CoreLoadError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let symbols = CoreSymbols::resolve(&library)?;

        let found = unsafe { (symbols.api_version)() };
        if found != RETRO_API_VERSION {
            return Err(CoreLoadError::ApiVersionMismatch {
                expected: RETRO_API_VERSION,
                found,
            });
        }

        environment::reset(path, paths, peek_only);
        unsafe { (symbols.set_environment)(environment::environment_callback) };

        if !peek_only {
            info!("Opened core {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            symbols,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DynamicCore {
    fn drop(&mut self) {
        environment::clear();
        debug!("Closed core {}", self.path.display());
    }
}

fn path_cstring(path: &Path) -> Option<CString> {
    CString::new(path.to_string_lossy().into_owned()).ok()
}

/// C view of a [`GameInfo`]; the strings live as long as this value
struct StagedGame<'a> {
    path: Option<CString>,
    meta: Option<CString>,
    data: Option<&'a [u8]>,
}

impl<'a> StagedGame<'a> {
    fn new(game: &'a GameInfo) -> Self {
        Self {
            path: game.path().and_then(path_cstring),
            meta: game.meta.as_ref().and_then(|meta| CString::new(meta.as_str()).ok()),
            data: game.data.as_deref(),
        }
    }

    fn raw(&self) -> abi::retro_game_info {
        abi::retro_game_info {
            path: self.path.as_ref().map_or(ptr::null(), |path| path.as_ptr()),
            data: self.data.map_or(ptr::null(), |data| data.as_ptr() as *const c_void),
            size: self.data.map_or(0, <[u8]>::len),
            meta: self.meta.as_ref().map_or(ptr::null(), |meta| meta.as_ptr()),
        }
    }
}

impl CoreBinding for DynamicCore {
    fn api_version(&self) -> u32 {
        unsafe { (self.symbols.api_version)() }
    }

    fn init(&mut self) {
        unsafe { (self.symbols.init)() }
    }

    fn deinit(&mut self) {
        unsafe { (self.symbols.deinit)() }
    }

    fn system_info(&self) -> SystemInfo {
        let mut raw = abi::retro_system_info {
            library_name: ptr::null(),
            library_version: ptr::null(),
            valid_extensions: ptr::null(),
            need_fullpath: false,
            block_extract: false,
        };
        unsafe {
            (self.symbols.get_system_info)(&mut raw);
            SystemInfo {
                library_name: c_string_lossy(raw.library_name).unwrap_or_default(),
                library_version: c_string_lossy(raw.library_version).unwrap_or_default(),
                valid_extensions: crate::binding::parse_extension_list(
                    &c_string_lossy(raw.valid_extensions).unwrap_or_default(),
                ),
                need_fullpath: raw.need_fullpath,
                block_extract: raw.block_extract,
            }
        }
    }

    fn system_av_info(&self) -> SystemAvInfo {
        let mut raw = abi::retro_system_av_info::default();
        unsafe { (self.symbols.get_system_av_info)(&mut raw) };
        SystemAvInfo::from(raw)
    }

    fn declarations(&self) -> CoreDeclarations {
        environment::declarations()
    }

    fn take_messages(&mut self) -> Vec<String> {
        environment::take_messages()
    }

    fn set_callbacks(&mut self, callbacks: &Callbacks) {
        unsafe {
            (self.symbols.set_video_refresh)(callbacks.video_refresh);
            (self.symbols.set_audio_sample)(callbacks.audio_sample);
            (self.symbols.set_audio_sample_batch)(callbacks.audio_sample_batch);
            (self.symbols.set_input_poll)(callbacks.input_poll);
            (self.symbols.set_input_state)(callbacks.input_state);
        }
    }

    fn set_controller_port_device(&mut self, port: u32, device: u32) {
        unsafe { (self.symbols.set_controller_port_device)(port, device) }
    }

    fn reset(&mut self) {
        unsafe { (self.symbols.reset)() }
    }

    fn run(&mut self) {
        unsafe { (self.symbols.run)() }
    }

    fn serialize_size(&mut self) -> usize {
        unsafe { (self.symbols.serialize_size)() }
    }

    fn serialize(&mut self, buf: &mut [u8]) -> bool {
        unsafe { (self.symbols.serialize)(buf.as_mut_ptr() as *mut c_void, buf.len()) }
    }

    fn unserialize(&mut self, buf: &[u8]) -> bool {
        unsafe { (self.symbols.unserialize)(buf.as_ptr() as *const c_void, buf.len()) }
    }

    fn cheat_reset(&mut self) {
        unsafe { (self.symbols.cheat_reset)() }
    }

    fn cheat_set(&mut self, index: u32, enabled: bool, code: &str) {
        match CString::new(code) {
            Ok(code) => unsafe { (self.symbols.cheat_set)(index, enabled, code.as_ptr()) },
            Err(_) => warn!("Ignoring cheat {} containing a NUL byte", index),
        }
    }

    fn load_game(&mut self, game: Option<&GameInfo>) -> bool {
        match game {
            None => unsafe { (self.symbols.load_game)(ptr::null()) },
            Some(game) => {
                let staged = StagedGame::new(game);
                let raw = staged.raw();
                unsafe { (self.symbols.load_game)(&raw) }
            }
        }
    }

    fn load_game_special(&mut self, game_type: u32, games: &[GameInfo]) -> bool {
        let staged: Vec<StagedGame<'_>> = games.iter().map(StagedGame::new).collect();
        let raw: Vec<abi::retro_game_info> = staged.iter().map(StagedGame::raw).collect();
        unsafe { (self.symbols.load_game_special)(game_type, raw.as_ptr(), raw.len()) }
    }

    fn unload_game(&mut self) {
        unsafe { (self.symbols.unload_game)() }
    }

    fn region(&self) -> Region {
        Region::from(unsafe { (self.symbols.get_region)() })
    }

    fn memory(&mut self, id: MemoryType) -> Option<&mut [u8]> {
        let raw = id.as_raw();
        unsafe {
            let data = (self.symbols.get_memory_data)(raw);
            let size = (self.symbols.get_memory_size)(raw);
            if data.is_null() || size == 0 {
                None
            } else {
                Some(std::slice::from_raw_parts_mut(data as *mut u8, size))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_library() {
        let err = DynamicCore::open(
            Path::new("/nonexistent/missing_libretro.so"),
            &FrontendPaths::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, CoreLoadError::Open { .. }));
    }

    #[test]
    fn test_staged_game_pointers() {
        let game = GameInfo {
            path: Some(PathBuf::from("/roms/game.sfc")),
            data: Some(vec![1, 2, 3]),
            meta: None,
        };
        let staged = StagedGame::new(&game);
        let raw = staged.raw();
        assert!(!raw.path.is_null());
        assert!(!raw.data.is_null());
        assert_eq!(raw.size, 3);
        assert!(raw.meta.is_null());
        assert_eq!(
            unsafe { c_string_lossy(raw.path) },
            Some("/roms/game.sfc".to_string())
        );
    }

    #[test]
    fn test_staged_empty_game() {
        let game = GameInfo::default();
        let raw = StagedGame::new(&game).raw();
        assert!(raw.path.is_null());
        assert!(raw.data.is_null());
        assert_eq!(raw.size, 0);
    }
}

//! Content runtime
//!
//! Owns everything that lives as long as content is loaded:
//! - The lifecycle state (`Empty -> Loading -> Loaded -> Unloading -> Empty`)
//! - Temporary files created by extraction and sandbox copies
//! - The identifying CRC of the primary content, computed at most once
//! - The subsystem selection being built before a load
//! - A snapshot of what was handed to the core

use crate::core_handle::CoreHandle;
use crate::loader::{self, LoadOutcome, LoadedContent};
use crate::main_wrap::MainWrap;
use crate::resolver::{CrcSource, Resolver};
use crate::subsystem::{self, ContentSelection};
use crate::temporary::TemporaryContent;
use rh_core::config::Config;
use rh_core::error::SubsystemError;
use rh_core::{Result, RuntimeError};
use rh_ffi::{CoreBinding, CoreDeclarations, SubsystemDescriptor};
use rh_loader::{content_crc32, PatchSettings};
use rh_vfs::{ContentPath, SandboxPolicy};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Most roms a pending subsystem selection can hold
pub const MAX_SUBSYSTEM_ROMS: usize = 10;

/// Content lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Empty,
    Loading,
    Loaded,
    Unloading,
}

/// A subsystem selection under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubsystem {
    /// Position in the core's declared subsystem list
    pub index: usize,
    pub ident: String,
    pub id: u32,
    /// Roms the subsystem declares
    pub rom_count: usize,
    pub roms: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum RomCrc {
    #[default]
    Unset,
    Deferred(ContentPath),
    Computed {
        value: u32,
        path: Option<ContentPath>,
    },
}

/// Loaded-content state shared by the load and unload paths
pub struct ContentRuntime {
    state: LifecycleState,
    is_inited: bool,
    core_does_not_need_content: bool,
    rom_crc: RomCrc,
    temporary: TemporaryContent,
    pending: Option<PendingSubsystem>,
    companion_ui_db_name: Option<String>,
    companion_ui_crc32: Option<u32>,
    loaded: Option<LoadedContent>,
    cache_dir: PathBuf,
    sandbox: SandboxPolicy,
    patches: PatchSettings,
}

impl ContentRuntime {
    /// Create a runtime from configuration
    pub fn new(config: &Config) -> Self {
        let cache_dir = config.paths.cache_dir.clone();
        let sandbox = SandboxPolicy::new(&config.sandbox, &cache_dir);
        Self::with_settings(cache_dir, sandbox, PatchSettings::from_config(&config.patch))
    }

    pub fn with_settings(cache_dir: PathBuf, sandbox: SandboxPolicy, patches: PatchSettings) -> Self {
        Self {
            state: LifecycleState::Empty,
            is_inited: false,
            core_does_not_need_content: false,
            rom_crc: RomCrc::Unset,
            temporary: TemporaryContent::new(),
            pending: None,
            companion_ui_db_name: None,
            companion_ui_crc32: None,
            loaded: None,
            cache_dir,
            sandbox,
            patches,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LifecycleState::Loaded
    }

    pub fn is_inited(&self) -> bool {
        self.is_inited
    }

    pub fn core_does_not_need_content(&self) -> bool {
        self.core_does_not_need_content
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn patch_settings(&self) -> &PatchSettings {
        &self.patches
    }

    pub fn set_patch_settings(&mut self, patches: PatchSettings) {
        self.patches = patches;
    }

    /// Files to delete when the content is unloaded
    pub fn temporary_content(&self) -> &[PathBuf] {
        self.temporary.paths()
    }

    /// What the last successful load handed to the core
    pub fn loaded(&self) -> Option<&LoadedContent> {
        self.loaded.as_ref()
    }

    fn transition(&mut self, state: LifecycleState) {
        debug!("Content state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Load `selection` into `core`
    ///
    /// On failure everything created so far is torn down before the error
    /// is returned.
    pub fn load<B: CoreBinding>(
        &mut self,
        core: &mut CoreHandle<B>,
        selection: &ContentSelection,
    ) -> Result<()> {
        if self.state != LifecycleState::Empty {
            return Err(RuntimeError::InvalidState(format!(
                "cannot load content while {:?}",
                self.state
            )));
        }
        if !core.symbols_inited() {
            return Err(RuntimeError::InvalidState("core has been unloaded".to_string()));
        }

        self.transition(LifecycleState::Loading);
        self.temporary = TemporaryContent::new();

        core.init();
        let declarations = core.declarations();
        self.core_does_not_need_content = declarations.supports_no_game;

        match self.load_selection(core, selection, &declarations) {
            Ok(outcome) => {
                self.rom_crc = match outcome.crc {
                    Some(CrcSource::Computed(value)) => RomCrc::Computed { value, path: None },
                    Some(CrcSource::Deferred(path)) => RomCrc::Deferred(path),
                    None => RomCrc::Unset,
                };
                self.is_inited = true;
                if selection.is_subsystem() {
                    self.pending = None;
                }
                info!(
                    "Content loaded ({} items, {} temporary files)",
                    outcome.content.items.len(),
                    self.temporary.len()
                );
                self.loaded = Some(outcome.content);
                self.transition(LifecycleState::Loaded);
                Ok(())
            }
            Err(e) => {
                error!("Failed to load content: {}", e);
                self.teardown();
                self.transition(LifecycleState::Empty);
                Err(e)
            }
        }
    }

    fn load_selection<B: CoreBinding>(
        &mut self,
        core: &mut CoreHandle<B>,
        selection: &ContentSelection,
        declarations: &CoreDeclarations,
    ) -> Result<LoadOutcome> {
        let assembly = subsystem::assemble(selection, core.system_info(), declarations)?;
        let resolver = Resolver {
            cache_dir: &self.cache_dir,
            sandbox: &self.sandbox,
            patches: &self.patches,
            core_supports_vfs: declarations.supports_vfs,
        };
        loader::load_content(core, &assembly, &resolver, &mut self.temporary)
    }

    /// Load whatever the command line asked for
    pub fn load_main_wrap<B: CoreBinding>(
        &mut self,
        core: &mut CoreHandle<B>,
        wrap: &MainWrap,
    ) -> Result<()> {
        // The command line overrides only apply to this load
        let overrides = wrap.patch_settings(self.patches.enabled);
        let saved = std::mem::replace(&mut self.patches, overrides);
        let result = self.load_wrapped(core, wrap);
        self.patches = saved;
        result
    }

    fn load_wrapped<B: CoreBinding>(&mut self, core: &mut CoreHandle<B>, wrap: &MainWrap) -> Result<()> {
        let Some(ident) = wrap.subsystem.as_deref() else {
            return self.load(core, &wrap.selection());
        };

        self.set_subsystem_by_name(&core.declarations().subsystems, ident)?;
        for rom in &wrap.subsystem_roms {
            self.add_subsystem_rom(rom.clone())?;
        }
        self.load_pending(core)
    }

    /// Load the pending subsystem selection
    pub fn load_pending<B: CoreBinding>(&mut self, core: &mut CoreHandle<B>) -> Result<()> {
        let selection = self
            .pending_selection()
            .ok_or_else(|| RuntimeError::InvalidState("no subsystem selected".to_string()))?;
        self.load(core, &selection)
    }

    /// Unload the game and delete temporary content
    pub fn unload<B: CoreBinding>(&mut self, core: &mut CoreHandle<B>) {
        if self.state == LifecycleState::Empty {
            debug!("No content to unload");
            return;
        }

        self.transition(LifecycleState::Unloading);
        core.unload_game();
        self.teardown();
        self.transition(LifecycleState::Empty);
        info!("Content unloaded");
    }

    fn teardown(&mut self) {
        let removed = self.temporary.remove_all();
        if removed > 0 {
            debug!("Removed {} temporary files", removed);
        }
        self.rom_crc = RomCrc::Unset;
        self.core_does_not_need_content = false;
        self.is_inited = false;
        self.loaded = None;
        self.companion_ui_db_name = None;
        self.companion_ui_crc32 = None;
    }

    /// CRC32 identifying the primary content, zero when there is none
    ///
    /// Deferred checksums are computed on the first call and cached.
    pub fn content_crc(&mut self) -> u32 {
        let path = match &self.rom_crc {
            RomCrc::Unset => return 0,
            RomCrc::Computed { value, .. } => return *value,
            RomCrc::Deferred(path) => path.clone(),
        };

        let value = match content_crc32(&path) {
            Ok(value) => {
                debug!("CRC32 of {} is {:08x}", path, value);
                value
            }
            Err(e) => {
                warn!("Failed to compute CRC32 of {}: {}", path, e);
                0
            }
        };
        self.rom_crc = RomCrc::Computed {
            value,
            path: Some(path),
        };
        value
    }

    /// Whether the CRC is still waiting to be computed
    pub fn crc_is_deferred(&self) -> bool {
        matches!(self.rom_crc, RomCrc::Deferred(_))
    }

    /// Content the CRC is (or will be) computed from; `None` for a patched buffer
    pub fn crc_path(&self) -> Option<&ContentPath> {
        match &self.rom_crc {
            RomCrc::Deferred(path) => Some(path),
            RomCrc::Computed { path, .. } => path.as_ref(),
            RomCrc::Unset => None,
        }
    }

    /// Select the subsystem at `index` and start a new rom list
    pub fn set_subsystem(
        &mut self,
        subsystems: &[SubsystemDescriptor],
        index: usize,
    ) -> std::result::Result<(), SubsystemError> {
        let subsystem = subsystems
            .get(index)
            .ok_or(SubsystemError::InvalidIndex(index))?;
        debug!("Pending subsystem {} ({} roms)", subsystem.ident, subsystem.num_roms());
        self.pending = Some(PendingSubsystem {
            index,
            ident: subsystem.ident.clone(),
            id: subsystem.id,
            rom_count: subsystem.num_roms(),
            roms: Vec::new(),
        });
        Ok(())
    }

    pub fn set_subsystem_by_name(
        &mut self,
        subsystems: &[SubsystemDescriptor],
        ident: &str,
    ) -> std::result::Result<(), SubsystemError> {
        let index = subsystems
            .iter()
            .position(|subsystem| subsystem.ident == ident)
            .ok_or_else(|| SubsystemError::Unknown(ident.to_string()))?;
        self.set_subsystem(subsystems, index)
    }

    /// Append a rom to the pending selection
    pub fn add_subsystem_rom(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| RuntimeError::InvalidState("no subsystem selected".to_string()))?;
        if pending.roms.len() >= MAX_SUBSYSTEM_ROMS {
            return Err(SubsystemError::TooManyRoms {
                max: MAX_SUBSYSTEM_ROMS,
            }
            .into());
        }
        pending.roms.push(path.into());
        Ok(())
    }

    pub fn subsystem_rom(&self, index: usize) -> Option<&Path> {
        self.pending
            .as_ref()
            .and_then(|pending| pending.roms.get(index))
            .map(PathBuf::as_path)
    }

    pub fn pending_subsystem(&self) -> Option<&PendingSubsystem> {
        self.pending.as_ref()
    }

    pub fn clear_subsystem(&mut self) {
        self.pending = None;
    }

    /// The pending subsystem as a selection ready to load
    pub fn pending_selection(&self) -> Option<ContentSelection> {
        self.pending.as_ref().map(|pending| ContentSelection::Subsystem {
            ident: pending.ident.clone(),
            roms: pending.roms.clone(),
        })
    }

    /// Database name supplied by a caller that already identified the content
    pub fn set_companion_ui_db_name(&mut self, name: impl Into<String>) {
        self.companion_ui_db_name = Some(name.into());
    }

    pub fn companion_ui_db_name(&self) -> Option<&str> {
        self.companion_ui_db_name.as_deref()
    }

    pub fn set_companion_ui_crc32(&mut self, crc: u32) {
        self.companion_ui_crc32 = Some(crc);
    }

    pub fn companion_ui_crc32(&self) -> Option<u32> {
        self.companion_ui_crc32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_ffi::SubsystemRom;

    fn runtime() -> ContentRuntime {
        ContentRuntime::with_settings(
            PathBuf::from("/tmp/retrohost-cache"),
            SandboxPolicy::disabled(),
            PatchSettings::default(),
        )
    }

    fn subsystems() -> Vec<SubsystemDescriptor> {
        vec![
            SubsystemDescriptor {
                ident: "sgb".to_string(),
                desc: "Super Game Boy".to_string(),
                id: 0,
                roms: vec![SubsystemRom::default(); 2],
            },
            SubsystemDescriptor {
                ident: "sufami_turbo".to_string(),
                desc: "Sufami Turbo".to_string(),
                id: 1,
                roms: vec![SubsystemRom::default(); 3],
            },
        ]
    }

    #[test]
    fn test_initial_state() {
        let mut runtime = runtime();
        assert_eq!(runtime.state(), LifecycleState::Empty);
        assert!(!runtime.is_inited());
        assert!(runtime.loaded().is_none());
        assert_eq!(runtime.content_crc(), 0);
        assert!(runtime.temporary_content().is_empty());
    }

    #[test]
    fn test_pending_subsystem_editing() {
        let mut runtime = runtime();
        assert!(runtime.add_subsystem_rom("a.sfc").is_err());

        runtime.set_subsystem_by_name(&subsystems(), "sufami_turbo").unwrap();
        runtime.add_subsystem_rom("base.sfc").unwrap();
        runtime.add_subsystem_rom("slot_a.st").unwrap();

        let pending = runtime.pending_subsystem().unwrap();
        assert_eq!(pending.index, 1);
        assert_eq!(pending.id, 1);
        assert_eq!(pending.rom_count, 3);
        assert_eq!(runtime.subsystem_rom(1), Some(Path::new("slot_a.st")));
        assert_eq!(runtime.subsystem_rom(2), None);
        assert_eq!(
            runtime.pending_selection(),
            Some(ContentSelection::Subsystem {
                ident: "sufami_turbo".to_string(),
                roms: vec![PathBuf::from("base.sfc"), PathBuf::from("slot_a.st")],
            })
        );

        // Picking a subsystem again starts a fresh list
        runtime.set_subsystem(&subsystems(), 0).unwrap();
        assert!(runtime.pending_subsystem().unwrap().roms.is_empty());

        runtime.clear_subsystem();
        assert!(runtime.pending_selection().is_none());
    }

    #[test]
    fn test_pending_subsystem_limits() {
        let mut runtime = runtime();
        assert!(matches!(
            runtime.set_subsystem(&subsystems(), 5),
            Err(SubsystemError::InvalidIndex(5))
        ));
        assert!(matches!(
            runtime.set_subsystem_by_name(&subsystems(), "msu1"),
            Err(SubsystemError::Unknown(_))
        ));

        runtime.set_subsystem(&subsystems(), 0).unwrap();
        for i in 0..MAX_SUBSYSTEM_ROMS {
            runtime.add_subsystem_rom(format!("{}.rom", i)).unwrap();
        }
        assert!(matches!(
            runtime.add_subsystem_rom("overflow.rom"),
            Err(RuntimeError::SubsystemMismatch(SubsystemError::TooManyRoms { max: 10 }))
        ));
    }

    #[test]
    fn test_companion_identifiers() {
        let mut runtime = runtime();
        assert!(runtime.companion_ui_db_name().is_none());
        runtime.set_companion_ui_db_name("Nintendo - Super Nintendo Entertainment System.rdb");
        runtime.set_companion_ui_crc32(0xdead_beef);
        assert_eq!(runtime.companion_ui_crc32(), Some(0xdead_beef));
        assert!(runtime
            .companion_ui_db_name()
            .is_some_and(|name| name.ends_with(".rdb")));
    }

    #[test]
    fn test_runtime_from_config() {
        let mut config = Config::default();
        config.paths.cache_dir = PathBuf::from("/var/cache/retrohost");
        config.patch.enabled = false;

        let runtime = ContentRuntime::new(&config);
        assert_eq!(runtime.cache_dir(), Path::new("/var/cache/retrohost"));
        assert!(!runtime.patch_settings().enabled);
    }
}

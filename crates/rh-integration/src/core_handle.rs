//! Core handle
//!
//! Wraps a [`CoreBinding`] with the frontend-side bookkeeping a core needs:
//! - Whether `retro_init` ran and whether a game is loaded
//! - When input is polled relative to `run()`
//! - Which callbacks are installed, and refusing to swap them mid-session

use rh_core::config::PollType;
use rh_core::error::CoreLoadError;
use rh_ffi::abi::RETRO_API_VERSION;
use rh_ffi::{
    Callbacks, CoreBinding, CoreDeclarations, DynamicCore, FrontendPaths, GameInfo, MemoryType,
    Region, SerializationQuirks, SystemAvInfo, SystemInfo,
};
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Samples input devices on behalf of the core
pub trait InputPoller {
    fn poll(&mut self);
}

impl<F: FnMut()> InputPoller for F {
    fn poll(&mut self) {
        self()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PollState {
    poll_type: PollType,
    polled: bool,
}

/// Per-frame input polling state shared with the driver's input trampolines
///
/// The trampolines run inside the core's `run()`, while the handle is
/// mutably borrowed, so they consult a clone of this instead of the handle.
#[derive(Debug, Clone, Default)]
pub struct PollTracker {
    state: Rc<Cell<PollState>>,
}

impl PollTracker {
    fn new(poll_type: PollType) -> Self {
        Self {
            state: Rc::new(Cell::new(PollState {
                poll_type,
                polled: false,
            })),
        }
    }

    pub fn poll_type(&self) -> PollType {
        self.state.get().poll_type
    }

    fn set_poll_type(&self, poll_type: PollType) {
        let mut state = self.state.get();
        state.poll_type = poll_type;
        self.state.set(state);
    }

    fn mark_polled(&self) {
        let mut state = self.state.get();
        state.polled = true;
        self.state.set(state);
    }

    /// Whether input has been polled since the current frame started
    pub fn polled(&self) -> bool {
        self.state.get().polled
    }

    fn begin_frame(&self) -> PollType {
        let mut state = self.state.get();
        state.polled = false;
        self.state.set(state);
        state.poll_type
    }

    /// The core called its input poll callback; true when the driver should poll now
    pub fn on_core_poll(&self) -> bool {
        if self.poll_type() != PollType::Normal {
            return false;
        }
        self.mark_polled();
        true
    }

    /// The core asked for input state; true when the driver should poll first
    pub fn on_input_state(&self) -> bool {
        if self.poll_type() != PollType::Late || self.polled() {
            return false;
        }
        self.mark_polled();
        true
    }
}

/// A core plus the frontend's view of its lifecycle
pub struct CoreHandle<B: CoreBinding> {
    binding: B,
    system_info: SystemInfo,
    inited: bool,
    symbols_inited: bool,
    game_loaded: bool,
    callbacks_set: bool,
    poll: PollTracker,
}

impl CoreHandle<DynamicCore> {
    /// Open a core library and wrap it
    pub fn load(path: &Path, paths: &FrontendPaths) -> Result<Self, CoreLoadError> {
        let core = DynamicCore::open(path, paths)?;
        Self::new(core)
    }
}

impl<B: CoreBinding> CoreHandle<B> {
    /// Wrap a bound core; the core must speak the supported API version
    pub fn new(binding: B) -> Result<Self, CoreLoadError> {
        let found = binding.api_version();
        if found != RETRO_API_VERSION {
            return Err(CoreLoadError::ApiVersionMismatch {
                expected: RETRO_API_VERSION,
                found,
            });
        }

        let system_info = binding.system_info();
        info!(
            "Bound core {} {}",
            system_info.library_name, system_info.library_version
        );

        Ok(Self {
            binding,
            system_info,
            inited: false,
            symbols_inited: true,
            game_loaded: false,
            callbacks_set: false,
            poll: PollTracker::new(PollType::default()),
        })
    }

    /// Call `retro_init` once; an unloaded handle stays unloaded
    pub fn init(&mut self) {
        if !self.symbols_inited {
            warn!("Core was unloaded; not initializing it again");
            return;
        }
        if self.inited {
            return;
        }
        self.binding.init();
        self.inited = true;
        debug!("Core initialized");
    }

    pub fn is_inited(&self) -> bool {
        self.inited
    }

    pub fn symbols_inited(&self) -> bool {
        self.symbols_inited
    }

    pub fn is_game_loaded(&self) -> bool {
        self.game_loaded
    }

    pub fn system_info(&self) -> &SystemInfo {
        &self.system_info
    }

    pub fn system_av_info(&self) -> SystemAvInfo {
        self.binding.system_av_info()
    }

    /// Everything the core declared through the environment callback so far
    pub fn declarations(&self) -> CoreDeclarations {
        self.binding.declarations()
    }

    pub fn has_set_subsystems(&self) -> bool {
        self.binding.declarations().has_set_subsystems
    }

    pub fn has_set_input_descriptors(&self) -> bool {
        self.binding.declarations().has_set_input_descriptors
    }

    pub fn quirks(&self) -> SerializationQuirks {
        self.binding.declarations().quirks
    }

    /// Install driver callbacks; refused once a game is loaded
    pub fn set_callbacks(&mut self, callbacks: &Callbacks) -> bool {
        if self.game_loaded {
            warn!("Ignoring callback change while a game is loaded");
            return false;
        }
        self.binding.set_callbacks(callbacks);
        self.callbacks_set = true;
        true
    }

    pub fn callbacks_set(&self) -> bool {
        self.callbacks_set
    }

    pub fn poll_type(&self) -> PollType {
        self.poll.poll_type()
    }

    pub fn set_poll_type(&mut self, poll_type: PollType) {
        debug!("Input poll type {:?}", poll_type);
        self.poll.set_poll_type(poll_type);
    }

    /// Shared poll state for the driver's input trampolines
    pub fn poll_tracker(&self) -> PollTracker {
        self.poll.clone()
    }

    pub fn input_polled(&self) -> bool {
        self.poll.polled()
    }

    /// See [`PollTracker::on_core_poll`]
    pub fn poll_on_core_request(&self) -> bool {
        self.poll.on_core_poll()
    }

    /// See [`PollTracker::on_input_state`]
    pub fn poll_on_input_state(&self) -> bool {
        self.poll.on_input_state()
    }

    /// Run one frame
    ///
    /// A game must be loaded. Early polling samples input before the core
    /// runs; late polling samples it afterwards if the core never asked.
    pub fn run(&mut self, poller: &mut dyn InputPoller) {
        debug_assert!(self.game_loaded, "run() called without a loaded game");
        if !self.game_loaded {
            warn!("run() called without a loaded game");
            return;
        }

        match self.poll.begin_frame() {
            PollType::Early => {
                poller.poll();
                self.poll.mark_polled();
                self.binding.run();
            }
            PollType::Normal => self.binding.run(),
            PollType::Late => {
                self.binding.run();
                if !self.poll.polled() {
                    poller.poll();
                    self.poll.mark_polled();
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.binding.reset();
    }

    pub fn set_controller_port_device(&mut self, port: u32, device: u32) {
        self.binding.set_controller_port_device(port, device);
    }

    pub fn cheat_reset(&mut self) {
        self.binding.cheat_reset();
    }

    pub fn cheat_set(&mut self, index: u32, enabled: bool, code: &str) {
        self.binding.cheat_set(index, enabled, code);
    }

    pub fn region(&self) -> Region {
        self.binding.region()
    }

    pub fn memory(&mut self, id: MemoryType) -> Option<&mut [u8]> {
        self.binding.memory(id)
    }

    /// Zero means the core has no save-state support
    pub fn serialize_size(&mut self) -> usize {
        self.binding.serialize_size()
    }

    pub fn serialize(&mut self, buf: &mut [u8]) -> bool {
        self.binding.serialize(buf)
    }

    pub fn unserialize(&mut self, buf: &[u8]) -> bool {
        self.binding.unserialize(buf)
    }

    /// Drain messages the core pushed for display
    pub fn take_messages(&mut self) -> Vec<String> {
        self.binding.take_messages()
    }

    pub(crate) fn load_game(&mut self, game: Option<&GameInfo>) -> bool {
        self.game_loaded = self.binding.load_game(game);
        self.game_loaded
    }

    pub(crate) fn load_game_special(&mut self, game_type: u32, games: &[GameInfo]) -> bool {
        self.game_loaded = self.binding.load_game_special(game_type, games);
        self.game_loaded
    }

    /// Unload the current game, keeping the core initialized
    pub fn unload_game(&mut self) {
        if self.game_loaded {
            self.binding.unload_game();
            self.game_loaded = false;
            debug!("Game unloaded");
        }
    }

    /// Unload any game and deinitialize the core; always legal
    pub fn unload(&mut self) {
        self.unload_game();
        if self.inited {
            self.binding.deinit();
            info!("Core deinitialized");
        }
        self.inited = false;
        self.symbols_inited = false;
        self.callbacks_set = false;
        self.poll.begin_frame();
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut B {
        &mut self.binding
    }
}

impl<B: CoreBinding> Drop for CoreHandle<B> {
    fn drop(&mut self) {
        self.unload();
    }
}

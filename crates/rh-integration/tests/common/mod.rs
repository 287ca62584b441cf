//! Spy core shared by the integration tests

#![allow(dead_code)]

use rh_core::config::SandboxConfig;
use rh_ffi::{
    Callbacks, CoreBinding, CoreDeclarations, GameInfo, MemoryType, Region, SubsystemDescriptor,
    SubsystemRom, SystemAvInfo, SystemInfo,
};
use rh_integration::{ContentRuntime, CoreHandle, PollTracker};
use rh_loader::PatchSettings;
use rh_vfs::SandboxPolicy;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A core that records every call made to it
pub struct MockCore {
    pub api_version: u32,
    pub info: SystemInfo,
    pub declarations: CoreDeclarations,
    pub accept_load: bool,
    pub calls: Vec<&'static str>,
    /// Content of the last load call; a contentless load records one empty item
    pub games: Vec<GameInfo>,
    pub game_type: Option<u32>,
    /// Whether each game path existed on disk during the load call
    pub paths_present: Vec<bool>,
    pub frame: u32,
    pub ram: Vec<u8>,
    /// Query input state through this tracker on every frame
    pub input_tracker: Option<PollTracker>,
    pub driver_polls: u32,
}

impl MockCore {
    pub fn new() -> Self {
        Self {
            api_version: 1,
            info: SystemInfo {
                library_name: "Mock".to_string(),
                library_version: "1.0".to_string(),
                valid_extensions: vec!["bin".to_string(), "sfc".to_string()],
                need_fullpath: false,
                block_extract: false,
            },
            declarations: CoreDeclarations::default(),
            accept_load: true,
            calls: Vec::new(),
            games: Vec::new(),
            game_type: None,
            paths_present: Vec::new(),
            frame: 0,
            ram: vec![0; 64],
            input_tracker: None,
            driver_polls: 0,
        }
    }

    pub fn need_fullpath(mut self) -> Self {
        self.info.need_fullpath = true;
        self
    }

    pub fn supports_no_game(mut self) -> Self {
        self.declarations.supports_no_game = true;
        self
    }

    pub fn rejecting(mut self) -> Self {
        self.accept_load = false;
        self
    }

    /// Sufami Turbo style subsystem: two full-path cartridge slots
    pub fn with_sufami_turbo(mut self) -> Self {
        let cartridge = SubsystemRom {
            desc: "Cartridge".to_string(),
            valid_extensions: vec!["rom".to_string(), "st".to_string()],
            need_fullpath: true,
            block_extract: false,
            required: true,
            memory: Vec::new(),
        };
        self.declarations.subsystems = vec![
            SubsystemDescriptor {
                ident: "sufami_turbo".to_string(),
                desc: "Sufami Turbo".to_string(),
                id: 1,
                roms: vec![cartridge.clone(), cartridge],
            },
            SubsystemDescriptor {
                ident: "bios_only".to_string(),
                desc: "BIOS".to_string(),
                id: 2,
                roms: Vec::new(),
            },
        ];
        self.declarations.has_set_subsystems = true;
        self
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    fn record_games(&mut self, games: &[GameInfo]) {
        self.games = games.to_vec();
        self.paths_present = games
            .iter()
            .map(|game| game.path().is_some_and(Path::exists))
            .collect();
    }
}

impl CoreBinding for MockCore {
    fn api_version(&self) -> u32 {
        self.api_version
    }

    fn init(&mut self) {
        self.calls.push("init");
    }

    fn deinit(&mut self) {
        self.calls.push("deinit");
    }

    fn system_info(&self) -> SystemInfo {
        self.info.clone()
    }

    fn system_av_info(&self) -> SystemAvInfo {
        SystemAvInfo::default()
    }

    fn declarations(&self) -> CoreDeclarations {
        self.declarations.clone()
    }

    fn set_callbacks(&mut self, _callbacks: &Callbacks) {
        self.calls.push("set_callbacks");
    }

    fn set_controller_port_device(&mut self, _port: u32, _device: u32) {
        self.calls.push("set_controller_port_device");
    }

    fn reset(&mut self) {
        self.calls.push("reset");
        self.frame = 0;
    }

    fn run(&mut self) {
        self.calls.push("run");
        if let Some(tracker) = &self.input_tracker {
            if tracker.on_input_state() {
                self.driver_polls += 1;
            }
        }
        self.frame += 1;
        let len = self.ram.len();
        let slot = self.frame as usize % len;
        self.ram[slot] = self.ram[slot].wrapping_add(self.frame as u8);
    }

    fn serialize_size(&mut self) -> usize {
        4 + self.ram.len()
    }

    fn serialize(&mut self, buf: &mut [u8]) -> bool {
        if buf.len() < 4 + self.ram.len() {
            return false;
        }
        buf[..4].copy_from_slice(&self.frame.to_le_bytes());
        buf[4..4 + self.ram.len()].copy_from_slice(&self.ram);
        true
    }

    fn unserialize(&mut self, buf: &[u8]) -> bool {
        if buf.len() < 4 + self.ram.len() {
            return false;
        }
        self.frame = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let len = self.ram.len();
        self.ram.copy_from_slice(&buf[4..4 + len]);
        true
    }

    fn cheat_reset(&mut self) {
        self.calls.push("cheat_reset");
    }

    fn cheat_set(&mut self, _index: u32, _enabled: bool, _code: &str) {
        self.calls.push("cheat_set");
    }

    fn load_game(&mut self, game: Option<&GameInfo>) -> bool {
        self.calls.push("load_game");
        match game {
            Some(game) => self.record_games(std::slice::from_ref(game)),
            None => self.record_games(&[GameInfo::default()]),
        }
        self.accept_load
    }

    fn load_game_special(&mut self, game_type: u32, games: &[GameInfo]) -> bool {
        self.calls.push("load_game_special");
        self.game_type = Some(game_type);
        self.record_games(games);
        self.accept_load
    }

    fn unload_game(&mut self) {
        self.calls.push("unload_game");
    }

    fn region(&self) -> Region {
        Region::Ntsc
    }

    fn memory(&mut self, id: MemoryType) -> Option<&mut [u8]> {
        match id {
            MemoryType::SystemRam => Some(&mut self.ram),
            _ => None,
        }
    }
}

/// Temporary directory with a content area and a cache directory
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn write(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    pub fn write_zip(&self, name: &str, members: &[(&str, &[u8])]) -> PathBuf {
        let path = self.dir.path().join(name);
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        for (member, data) in members {
            zip.start_file(*member, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    /// Files currently in the cache directory
    pub fn cached_files(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.cache_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn runtime(&self) -> ContentRuntime {
        ContentRuntime::with_settings(
            self.cache_dir(),
            SandboxPolicy::disabled(),
            PatchSettings::default(),
        )
    }

    /// Runtime for a sandbox where only the cache directory is reachable
    pub fn sandboxed_runtime(&self) -> ContentRuntime {
        let config = SandboxConfig {
            enabled: true,
            accessible_dirs: Vec::new(),
        };
        ContentRuntime::with_settings(
            self.cache_dir(),
            SandboxPolicy::new(&config, &self.cache_dir()),
            PatchSettings::default(),
        )
    }
}

pub fn handle(core: MockCore) -> CoreHandle<MockCore> {
    CoreHandle::new(core).unwrap()
}

//! retrohost - headless host for libretro-style cores
//!
//! Opens a core, loads content the way a full frontend would, runs a few
//! frames with no-op drivers and unloads again.
//!
//! # Usage
//!
//! ```bash
//! retrohost --core snes9x_libretro.so game.sfc --frames 600
//! retrohost --core snes9x_libretro.so --subsystem sufami_turbo base.sfc a.st b.st
//! retrohost --core snes9x_libretro.so --info
//! ```

use anyhow::{anyhow, Result};
use clap::Parser;
use rh_core::{logging, Config};
use rh_ffi::{Callbacks, DynamicCore, FrontendPaths};
use rh_integration::{ContentRuntime, CoreHandle, MainWrap};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "retrohost")]
#[command(author, version, about = "Headless host for libretro-style emulation cores")]
struct Args {
    /// Core library to load
    #[arg(long, short = 'L')]
    core: PathBuf,

    /// Content to load; omit to start a core that runs without content
    content: Option<PathBuf>,

    /// Load a subsystem: its identifier followed by every rom in slot order
    #[arg(long, num_args = 1.., value_name = "IDENT ROM")]
    subsystem: Option<Vec<String>>,

    /// Do not soft-patch content
    #[arg(long)]
    no_patch: bool,

    /// IPS patch to apply instead of the sidecar file
    #[arg(long, value_name = "FILE")]
    ips: Option<PathBuf>,

    /// UPS patch to apply instead of the sidecar file
    #[arg(long, value_name = "FILE")]
    ups: Option<PathBuf>,

    /// BPS patch to apply instead of the sidecar file
    #[arg(long, value_name = "FILE")]
    bps: Option<PathBuf>,

    /// Frames to run before unloading
    #[arg(long, default_value = "60")]
    frames: u32,

    /// Print the core's system info and subsystems as JSON and exit
    #[arg(long)]
    info: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    fn main_wrap(&self) -> MainWrap {
        let mut wrap = MainWrap::new(&self.core);
        wrap.content = self.content.clone();
        if let Some((ident, roms)) = self.subsystem.as_deref().and_then(<[String]>::split_first) {
            wrap = wrap.with_subsystem(ident, roms.iter().map(PathBuf::from).collect());
        }
        wrap.no_patch = self.no_patch;
        wrap.ips = self.ips.clone();
        wrap.ups = self.ups.clone();
        wrap.bps = self.bps.clone();
        wrap
    }
}

fn frontend_paths(config: &Config) -> FrontendPaths {
    FrontendPaths {
        system_dir: config.paths.system_dir.clone(),
        save_dir: config.paths.save_dir.clone(),
        username: std::env::var("USER").unwrap_or_else(|_| "retrohost".to_string()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow!("failed to load configuration: {}", e))?;
    logging::init(&config.debug)?;

    let paths = frontend_paths(&config);

    if args.info {
        let peek = DynamicCore::peek(&args.core, &paths)?;
        println!("{}", serde_json::to_string_pretty(&peek)?);
        return Ok(());
    }

    let wrap = args.main_wrap();
    let mut core = CoreHandle::load(&wrap.core, &paths)?;
    core.set_poll_type(config.input.poll_type);
    core.set_callbacks(&Callbacks::headless());

    let mut runtime = ContentRuntime::new(&config);
    if let Err(e) = runtime.load_main_wrap(&mut core, &wrap) {
        for message in core.take_messages() {
            warn!("Core: {}", message);
        }
        error!("Could not load content: {}", e);
        return Err(e.into());
    }

    let av_info = core.system_av_info();
    info!(
        "Running {} frames at {}x{}, {:.2} fps",
        args.frames, av_info.geometry.base_width, av_info.geometry.base_height, av_info.timing.fps
    );

    let mut poller = || {};
    for frame in 0..args.frames {
        core.run(&mut poller);
        for message in core.take_messages() {
            info!("Core: {}", message);
        }
        if core.declarations().shutdown_requested {
            info!("Core requested shutdown after {} frames", frame + 1);
            break;
        }
    }

    let crc = runtime.content_crc();
    if crc != 0 {
        info!("Content CRC32 {:08x}", crc);
    }

    let mut states = core.serialization();
    if let Some(state) = states.save() {
        if states.load(&state) {
            info!("Save state round trip succeeded ({} bytes)", state.len());
        }
    }

    runtime.unload(&mut core);
    core.unload();
    Ok(())
}

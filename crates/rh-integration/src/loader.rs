//! Content loader
//!
//! Resolves every slot of an assembly and hands the result to the core in a
//! single `load_game` or `load_game_special` call. Nothing reaches the core
//! unless every slot resolved.

use crate::core_handle::CoreHandle;
use crate::resolver::{CrcSource, LoadedItem, Resolver};
use crate::subsystem::Assembly;
use crate::temporary::TemporaryContent;
use rh_core::{Result, RuntimeError};
use rh_ffi::{Callbacks, CoreBinding, SubsystemDescriptor};
use tracing::{debug, info};

/// What a successful load handed to the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedContent {
    pub items: Vec<LoadedItem>,
    /// `None` for a plain load
    pub subsystem: Option<SubsystemDescriptor>,
}

impl LoadedContent {
    /// The primary item, if any
    pub fn primary(&self) -> Option<&LoadedItem> {
        self.items.first()
    }

    pub fn is_contentless(&self) -> bool {
        self.items.iter().all(|item| item.source.is_none())
    }
}

#[derive(Debug)]
pub(crate) struct LoadOutcome {
    pub content: LoadedContent,
    pub crc: Option<CrcSource>,
}

/// Load `assembly` into the core
///
/// Temporary files created while resolving are left in `temporary`, also
/// when the load fails; removing them is up to the caller.
pub(crate) fn load_content<B: CoreBinding>(
    core: &mut CoreHandle<B>,
    assembly: &Assembly,
    resolver: &Resolver<'_>,
    temporary: &mut TemporaryContent,
) -> Result<LoadOutcome> {
    if let Some(slot) = assembly
        .specs
        .iter()
        .position(|spec| spec.attributes.required && spec.path.is_none())
    {
        return Err(RuntimeError::MissingRequiredContent { slot });
    }

    let subsystem_mode = assembly.subsystem.is_some();
    let mut items = Vec::with_capacity(assembly.specs.len());
    let mut games = Vec::with_capacity(assembly.specs.len());
    let mut crc = None;
    for (slot, spec) in assembly.specs.iter().enumerate() {
        let resolved = resolver.resolve(spec, slot, subsystem_mode, temporary)?;
        if slot == 0 {
            crc = resolved.crc;
        }
        items.push(resolved.item);
        games.push(resolved.game);
    }

    if !core.callbacks_set() {
        debug!("No driver callbacks installed, using headless callbacks");
        core.set_callbacks(&Callbacks::headless());
    }

    let loaded = match &assembly.subsystem {
        Some(subsystem) => {
            info!(
                "Loading subsystem {} ({} content files)",
                subsystem.desc,
                games.len()
            );
            core.load_game_special(subsystem.id, &games)
        }
        None => match games.first().filter(|game| !game.is_empty()) {
            Some(game) => {
                info!(
                    "Loading content {}",
                    game.path().map(|p| p.display().to_string()).unwrap_or_default()
                );
                core.load_game(Some(game))
            }
            None => {
                info!("Starting core without content");
                core.load_game(None)
            }
        },
    };
    // In-memory buffers are only needed for the call itself.
    drop(games);

    if !loaded {
        if items.iter().any(|item| item.copied) {
            return Err(RuntimeError::CoreRequiresVfs);
        }
        return Err(RuntimeError::LoadRejected);
    }

    Ok(LoadOutcome {
        content: LoadedContent {
            items,
            subsystem: assembly.subsystem.clone(),
        },
        crc,
    })
}

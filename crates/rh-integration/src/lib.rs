//! Content runtime for retrohost
//!
//! This crate ties the core binding, content access and content transforms
//! together: it assembles what the user selected into content slots,
//! resolves each slot, loads the result into the core and tears it all down
//! again on unload.

pub mod core_handle;
pub mod loader;
pub mod main_wrap;
pub mod resolver;
pub mod runtime;
pub mod savestate;
pub mod subsystem;
pub mod temporary;

pub use core_handle::{CoreHandle, InputPoller, PollTracker};
pub use loader::LoadedContent;
pub use main_wrap::MainWrap;
pub use resolver::{CrcSource, LoadedItem, Resolver};
pub use runtime::{ContentRuntime, LifecycleState, PendingSubsystem, MAX_SUBSYSTEM_ROMS};
pub use savestate::SerializationBridge;
pub use subsystem::{assemble, Assembly, ContentAttributes, ContentSelection, ContentSpec};
pub use temporary::TemporaryContent;

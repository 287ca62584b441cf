//! Core bindings for retrohost
//!
//! Raw ABI mirrors live in [`abi`]. Everything above that layer goes through
//! the [`CoreBinding`] trait so the content runtime never sees a pointer.

pub mod abi;
pub mod binding;
pub mod environment;
pub mod library;
mod vfs;

pub use binding::{
    extension_in, parse_extension_list, Callbacks, CoreBinding, CoreDeclarations, GameInfo,
    GameGeometry, MemoryType, PixelFormat, Region, SerializationQuirks, SubsystemDescriptor,
    SubsystemMemory, SubsystemRom, SystemAvInfo, SystemInfo, SystemTiming,
};
pub use environment::FrontendPaths;
pub use library::{CorePeek, DynamicCore};

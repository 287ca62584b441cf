//! Core types for retrohost
//!
//! This crate provides the foundational error taxonomy, configuration,
//! and logging infrastructure shared by every other retrohost crate.

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{RuntimeError, Result};

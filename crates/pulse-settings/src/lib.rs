//! # pulse-settings
//!
//! Layered configuration for the relay:
//!
//! 1. Compiled defaults ([`types::PulseSettings::default`])
//! 2. `~/.pulse/settings.json`, deep-merged over the defaults
//! 3. `PULSE_*` environment variable overrides (highest priority)
//!
//! CLI flags are applied on top by the binary, outside this crate.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::SettingsError;
pub use types::{DirectorySettings, LogLevel, LoggingSettings, PulseSettings, ServerSettings};

//! # lookout-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`LookoutSettings::default()`]
//! 2. **Settings file**: `~/.lookout/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `LOOKOUT_*` overrides (highest priority)
//!
//! Settings are loaded once at startup and never mutated afterwards.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

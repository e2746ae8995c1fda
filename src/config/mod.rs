// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed raw model and the validated settings.
//! - `loader.rs`: reading `Simrun.toml` (or falling back to defaults).
//! - `validate.rs`: raw -> validated conversion.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_for_project, load_from_path};
pub use model::{
    BuildSettings, ConfigFile, DeviceSettings, RawConfigFile, WatchSettings,
};
pub use validate::validate_config;

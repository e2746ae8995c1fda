// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated model.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for a command invocation.
///
/// - An explicit path must exist and parse.
/// - Otherwise `Simrun.toml` in `project_dir` is used when present.
/// - Otherwise defaults apply.
pub fn load_for_project(explicit: Option<&Path>, project_dir: &Path) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading explicit config file");
        return load_and_validate(path);
    }

    let candidate = project_dir.join(default_config_path());
    if candidate.is_file() {
        debug!(path = %candidate.display(), "loading project config file");
        load_and_validate(candidate)
    } else {
        debug!("no config file found; using defaults");
        Ok(ConfigFile::default())
    }
}

/// File name looked up in the project directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Simrun.toml")
}

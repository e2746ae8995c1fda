// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    normalize_extension, BuildSettings, ConfigFile, DeviceSettings, RawConfigFile, WatchSettings,
};
use crate::errors::{Result, SimrunError};
use crate::exec::ToolCommand;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SimrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;

        let watch = WatchSettings {
            debounce: Duration::from_millis(raw.watch.debounce_ms),
            grace: Duration::from_millis(raw.watch.grace_ms),
            extensions: raw
                .watch
                .extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            ignore_dirs: raw.watch.ignore_dirs,
        };

        let build = BuildSettings {
            tool: tool_from_argv("build.tool", &raw.build.tool)?,
            derived_data: raw.build.derived_data,
            configuration: raw.build.configuration,
        };

        let device = DeviceSettings {
            simctl: tool_from_argv("device.simctl", &raw.device.simctl)?,
            plist_tool: tool_from_argv("device.plist_tool", &raw.device.plist_tool)?,
            default_device: raw
                .device
                .default_device
                .filter(|d| !d.trim().is_empty()),
        };

        Ok(ConfigFile::new_unchecked(watch, build, device))
    }
}

/// Check the semantic invariants serde cannot express.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch(cfg)?;
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(SimrunError::Config(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.watch.extensions.is_empty() {
        return Err(SimrunError::Config(
            "[watch].extensions must list at least one extension".to_string(),
        ));
    }

    if let Some(bad) = cfg
        .watch
        .extensions
        .iter()
        .find(|e| e.trim().trim_start_matches('.').is_empty())
    {
        return Err(SimrunError::Config(format!(
            "[watch].extensions contains an empty entry ({bad:?})"
        )));
    }

    Ok(())
}

fn tool_from_argv(key: &str, argv: &[String]) -> Result<ToolCommand> {
    match argv.split_first() {
        Some((program, args)) if !program.trim().is_empty() => {
            Ok(ToolCommand::new(program.clone()).with_args(args.iter().cloned()))
        }
        _ => Err(SimrunError::Config(format!(
            "[{key}] must name a program (got {argv:?})"
        ))),
    }
}

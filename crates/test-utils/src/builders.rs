#![allow(dead_code)]

use std::path::PathBuf;

use simrun::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn grace_ms(mut self, ms: u64) -> Self {
        self.config.watch.grace_ms = ms;
        self
    }

    pub fn extensions(mut self, exts: &[&str]) -> Self {
        self.config.watch.extensions = exts.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn ignore_dir(mut self, name: &str) -> Self {
        self.config.watch.ignore_dirs.push(name.to_string());
        self
    }

    pub fn build_tool(mut self, argv: &[&str]) -> Self {
        self.config.build.tool = argv.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn derived_data(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.build.derived_data = Some(dir.into());
        self
    }

    pub fn simctl(mut self, argv: &[&str]) -> Self {
        self.config.device.simctl = argv.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn plist_tool(mut self, argv: &[&str]) -> Self {
        self.config.device.plist_tool = argv.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn default_device(mut self, device: &str) -> Self {
        self.config.device.default_device = Some(device.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

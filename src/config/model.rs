// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::ToolCommand;
use crate::types::Configuration;

/// Top-level configuration as read from `Simrun.toml`.
///
/// ```toml
/// [watch]
/// debounce_ms = 750
/// grace_ms = 100
/// extensions = ["swift", "metal"]
/// ignore_dirs = ["DerivedData", "build"]
///
/// [build]
/// tool = ["xcodebuild"]
/// derived_data = "/tmp/dd"
/// configuration = "debug"
///
/// [device]
/// simctl = ["xcrun", "simctl"]
/// plist_tool = ["/usr/libexec/PlistBuddy"]
/// default_device = "iPhone 17 Pro"
/// ```
///
/// Every section is optional. A project without a config file behaves as
/// if an empty one was present.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub device: DeviceSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period after the last relevant change before a rebuild fires.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// After each rebuild, change notifications arriving within this window
    /// are discarded.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,

    /// File extensions that count as source changes (leading dot optional).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names that are never watched.
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    750
}

fn default_grace_ms() -> u64 {
    100
}

fn default_extensions() -> Vec<String> {
    ["swift", "m", "h", "c", "cpp", "metal", "xib", "storyboard"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignore_dirs() -> Vec<String> {
    ["DerivedData", "build", "Pods", "Carthage"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            grace_ms: default_grace_ms(),
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Build driver invocation; project arguments are appended to it.
    #[serde(default = "default_build_tool")]
    pub tool: Vec<String>,

    /// Override for the build tool's output-artifact cache.
    #[serde(default)]
    pub derived_data: Option<PathBuf>,

    /// Configuration used when the CLI does not pass `-c`.
    #[serde(default)]
    pub configuration: Configuration,
}

fn default_build_tool() -> Vec<String> {
    vec!["xcodebuild".to_string()]
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            tool: default_build_tool(),
            derived_data: None,
            configuration: Configuration::default(),
        }
    }
}

/// `[device]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSection {
    #[serde(default = "default_simctl")]
    pub simctl: Vec<String>,

    #[serde(default = "default_plist_tool")]
    pub plist_tool: Vec<String>,

    /// Device used by `run` when `-d` is not given.
    #[serde(default)]
    pub default_device: Option<String>,
}

fn default_simctl() -> Vec<String> {
    vec!["xcrun".to_string(), "simctl".to_string()]
}

fn default_plist_tool() -> Vec<String> {
    vec!["/usr/libexec/PlistBuddy".to_string()]
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            simctl: default_simctl(),
            plist_tool: default_plist_tool(),
            default_device: None,
        }
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`)
/// or `Default`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSettings,
    pub build: BuildSettings,
    pub device: DeviceSettings,
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub debounce: Duration,
    pub grace: Duration,
    /// Lowercased, each with a leading dot.
    pub extensions: Vec<String>,
    pub ignore_dirs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub tool: ToolCommand,
    pub derived_data: Option<PathBuf>,
    pub configuration: Configuration,
}

#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub simctl: ToolCommand,
    pub plist_tool: ToolCommand,
    pub default_device: Option<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        watch: WatchSettings,
        build: BuildSettings,
        device: DeviceSettings,
    ) -> Self {
        Self {
            watch,
            build,
            device,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let watch = WatchSection::default();
        let device = DeviceSection::default();
        Self {
            watch: WatchSettings {
                debounce: Duration::from_millis(watch.debounce_ms),
                grace: Duration::from_millis(watch.grace_ms),
                extensions: watch.extensions.iter().map(|e| normalize_extension(e)).collect(),
                ignore_dirs: watch.ignore_dirs,
            },
            build: BuildSettings {
                tool: ToolCommand::new("xcodebuild"),
                derived_data: None,
                configuration: Configuration::default(),
            },
            device: DeviceSettings {
                simctl: ToolCommand::new("xcrun").with_args(["simctl"]),
                plist_tool: ToolCommand::new("/usr/libexec/PlistBuddy"),
                default_device: device.default_device,
            },
        }
    }
}

/// `"Swift"` / `".swift"` -> `".swift"`.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

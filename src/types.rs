use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Boxed, sendable future used at the trait seams (device control, run
/// cycle, log source) so fakes can stand in for the real collaborators.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Target platform of a build or device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Macos,
    Watchos,
    Tvos,
    Visionos,
    Unknown,
}

impl Platform {
    /// Name used in build destinations (`platform=<name> Simulator,...`).
    pub fn destination_name(self) -> &'static str {
        match self {
            Platform::Ios | Platform::Unknown => "iOS",
            Platform::Macos => "macOS",
            Platform::Watchos => "watchOS",
            Platform::Tvos => "tvOS",
            Platform::Visionos => "visionOS",
        }
    }

    /// SDK suffix the build tool uses for simulator product directories.
    pub fn simulator_sdk(self) -> &'static str {
        match self {
            Platform::Tvos => "appletvsimulator",
            Platform::Watchos => "watchsimulator",
            Platform::Visionos => "xrsimulator",
            Platform::Macos => "macosx",
            Platform::Ios | Platform::Unknown => "iphonesimulator",
        }
    }

    /// Destination used when a build is not bound to a concrete device.
    pub fn default_destination(self) -> &'static str {
        match self {
            Platform::Macos => "platform=macOS",
            Platform::Watchos => "platform=watchOS Simulator,name=Apple Watch Series 9 (45mm)",
            Platform::Tvos => "platform=tvOS Simulator,name=Apple TV 4K (3rd generation)",
            Platform::Visionos => "platform=visionOS Simulator,name=Apple Vision Pro",
            Platform::Ios | Platform::Unknown => "platform=iOS Simulator,name=iPhone 17 Pro",
        }
    }

    /// Whether `run` can deploy to a simulator of this platform.
    pub fn is_simulated(self) -> bool {
        matches!(
            self,
            Platform::Ios | Platform::Watchos | Platform::Tvos | Platform::Visionos
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Ios => "ios",
            Platform::Macos => "macos",
            Platform::Watchos => "watchos",
            Platform::Tvos => "tvos",
            Platform::Visionos => "visionos",
            Platform::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "macos" => Ok(Platform::Macos),
            "watchos" => Ok(Platform::Watchos),
            "tvos" => Ok(Platform::Tvos),
            "visionos" | "xros" => Ok(Platform::Visionos),
            other => Err(format!(
                "unknown platform: {other} (valid: ios, macos, watchos, tvos, visionos)"
            )),
        }
    }
}

/// Build configuration passed to the build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Configuration {
    #[default]
    Debug,
    Release,
}

impl Configuration {
    /// Spelling the build tool expects (`Debug` / `Release`).
    pub fn as_tool_arg(self) -> &'static str {
        match self {
            Configuration::Debug => "Debug",
            Configuration::Release => "Release",
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tool_arg())
    }
}

impl FromStr for Configuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Configuration::Debug),
            "release" => Ok(Configuration::Release),
            other => Err(format!(
                "invalid configuration: {other} (expected \"debug\" or \"release\")"
            )),
        }
    }
}

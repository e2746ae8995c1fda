// src/device/types.rs

use std::fmt;

use serde::{Serialize, Serializer};

use crate::types::Platform;

/// Lifecycle state as reported by the simulator service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Shutdown,
    Booted,
    Booting,
    ShuttingDown,
    Other(String),
}

impl DeviceState {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Shutdown => "Shutdown",
            DeviceState::Booted => "Booted",
            DeviceState::Booting => "Booting",
            DeviceState::ShuttingDown => "Shutting Down",
            DeviceState::Other(s) => s,
        }
    }
}

impl From<&str> for DeviceState {
    fn from(s: &str) -> Self {
        match s {
            "Shutdown" => DeviceState::Shutdown,
            "Booted" => DeviceState::Booted,
            "Booting" => DeviceState::Booting,
            "Shutting Down" => DeviceState::ShuttingDown,
            other => DeviceState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeviceState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub udid: String,
    pub name: String,
    pub platform: Platform,
    pub os_version: String,
    pub state: DeviceState,
}

impl Device {
    pub fn is_booted(&self) -> bool {
        self.state == DeviceState::Booted
    }

    /// Build destination bound to exactly this device.
    pub fn destination(&self) -> String {
        format!(
            "platform={} Simulator,id={}",
            self.platform.destination_name(),
            self.udid
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceTypeInfo {
    pub identifier: String,
    pub name: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeInfo {
    pub identifier: String,
    pub name: String,
    pub version: String,
    pub platform: Platform,
    pub is_available: bool,
}

/// Platform and dotted OS version from a runtime identifier such as
/// `com.apple.CoreSimulator.SimRuntime.iOS-17-2`.
pub fn parse_runtime(runtime: &str) -> (Platform, String) {
    let lower = runtime.to_lowercase();

    let platform = if lower.contains("watchos") {
        Platform::Watchos
    } else if lower.contains("tvos") {
        Platform::Tvos
    } else if lower.contains("xros") || lower.contains("visionos") {
        Platform::Visionos
    } else if lower.contains("macos") {
        Platform::Macos
    } else if lower.contains("ios") {
        Platform::Ios
    } else {
        Platform::Unknown
    };

    let parts: Vec<&str> = lower.split('-').collect();
    let mut version_parts: Vec<&str> = Vec::new();
    if parts.len() >= 2 {
        for part in parts.iter().rev() {
            if part.starts_with(|c: char| c.is_ascii_digit()) {
                version_parts.push(part);
            } else {
                break;
            }
        }
    }
    version_parts.reverse();

    (platform, version_parts.join("."))
}

/// Platform of a device type identifier (`...SimDeviceType.iPhone-15-Pro`).
pub fn platform_from_identifier(id: &str) -> Platform {
    let id = id.to_lowercase();
    if id.contains("iphone") || id.contains("ipad") {
        Platform::Ios
    } else if id.contains("watch") {
        Platform::Watchos
    } else if id.contains("tv") {
        Platform::Tvos
    } else if id.contains("vision") {
        Platform::Visionos
    } else {
        Platform::Unknown
    }
}

/// Look a device up by exact identifier, then exact name (case-insensitive),
/// then name substring (case-insensitive).
pub fn find_device<'a>(devices: &'a [Device], query: &str) -> Option<&'a Device> {
    if let Some(d) = devices.iter().find(|d| d.udid == query) {
        return Some(d);
    }

    let needle = query.to_lowercase();
    devices
        .iter()
        .find(|d| d.name.to_lowercase() == needle)
        .or_else(|| {
            devices
                .iter()
                .find(|d| d.name.to_lowercase().contains(&needle))
        })
}

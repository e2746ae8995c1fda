// src/device/simctl.rs

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::device::control::DeviceControl;
use crate::device::types::{
    parse_runtime, platform_from_identifier, Device, DeviceState, DeviceTypeInfo, RuntimeInfo,
};
use crate::errors::{Result, SimrunError};
use crate::exec::{Executor, ToolCommand};
use crate::types::{BoxFuture, Platform};

#[derive(Debug, Deserialize)]
struct DeviceListing {
    #[serde(default)]
    devices: BTreeMap<String, Vec<RawDevice>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevice {
    udid: String,
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    is_available: bool,
}

#[derive(Debug, Deserialize)]
struct DeviceTypeListing {
    #[serde(default)]
    devicetypes: Vec<RawDeviceType>,
}

#[derive(Debug, Deserialize)]
struct RawDeviceType {
    identifier: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RuntimeListing {
    #[serde(default)]
    runtimes: Vec<RawRuntime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRuntime {
    identifier: String,
    name: String,
    #[serde(default)]
    is_available: bool,
}

/// Simulator control through the `simctl` command-line tool.
#[derive(Debug, Clone)]
pub struct Simctl {
    executor: Executor,
    tool: ToolCommand,
}

impl Simctl {
    pub fn new(executor: Executor, tool: ToolCommand) -> Self {
        Self { executor, tool }
    }

    async fn run(&self, args: &[&str], cancel: &CancellationToken) -> Result<Vec<u8>> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.executor.run_silent(&self.tool, &args, cancel).await
    }

    async fn list_devices(
        &self,
        platform: Option<Platform>,
        booted_only: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Device>> {
        let output = self.run(&["list", "devices", "-j"], cancel).await?;
        parse_device_listing(&output, platform, booted_only)
    }

    pub async fn shutdown_all(&self, cancel: &CancellationToken) -> Result<()> {
        self.run(&["shutdown", "all"], cancel).await?;
        Ok(())
    }

    pub async fn delete(&self, device: &Device, cancel: &CancellationToken) -> Result<()> {
        self.run(&["delete", &device.udid], cancel).await?;
        Ok(())
    }

    /// Create a simulator and return its identifier.
    pub async fn create(
        &self,
        name: &str,
        device_type_id: &str,
        runtime_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let output = self
            .run(&["create", name, device_type_id, runtime_id], cancel)
            .await?;
        Ok(String::from_utf8_lossy(&output).trim().to_string())
    }

    pub async fn list_device_types(&self, cancel: &CancellationToken) -> Result<Vec<DeviceTypeInfo>> {
        let output = self.run(&["list", "devicetypes", "-j"], cancel).await?;
        let listing: DeviceTypeListing = serde_json::from_slice(&output)?;
        Ok(listing
            .devicetypes
            .into_iter()
            .map(|dt| DeviceTypeInfo {
                platform: platform_from_identifier(&dt.identifier),
                identifier: dt.identifier,
                name: dt.name,
            })
            .collect())
    }

    pub async fn list_runtimes(&self, cancel: &CancellationToken) -> Result<Vec<RuntimeInfo>> {
        let output = self.run(&["list", "runtimes", "-j"], cancel).await?;
        let listing: RuntimeListing = serde_json::from_slice(&output)?;
        Ok(listing
            .runtimes
            .into_iter()
            .map(|rt| {
                let (platform, version) = parse_runtime(&rt.identifier);
                RuntimeInfo {
                    identifier: rt.identifier,
                    name: rt.name,
                    version,
                    platform,
                    is_available: rt.is_available,
                }
            })
            .collect())
    }

    /// Friendly device type name -> identifier. Identifiers pass through.
    pub async fn resolve_device_type(&self, input: &str, cancel: &CancellationToken) -> Result<String> {
        if input.starts_with("com.apple.") {
            return Ok(input.to_string());
        }
        let needle = input.to_lowercase();
        self.list_device_types(cancel)
            .await?
            .into_iter()
            .find(|t| t.name.to_lowercase().contains(&needle))
            .map(|t| t.identifier)
            .ok_or_else(|| SimrunError::NotFound(format!("device type {input}")))
    }

    /// Friendly runtime name -> identifier, among available runtimes.
    pub async fn resolve_runtime(&self, input: &str, cancel: &CancellationToken) -> Result<String> {
        if input.starts_with("com.apple.") {
            return Ok(input.to_string());
        }
        let needle = input.to_lowercase();
        self.list_runtimes(cancel)
            .await?
            .into_iter()
            .filter(|r| r.is_available)
            .find(|r| r.name.to_lowercase().contains(&needle))
            .map(|r| r.identifier)
            .ok_or_else(|| SimrunError::NotFound(format!("runtime {input}")))
    }
}

impl DeviceControl for Simctl {
    fn list<'a>(
        &'a self,
        platform: Option<Platform>,
        booted_only: bool,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<Device>>> {
        Box::pin(self.list_devices(platform, booted_only, cancel))
    }

    fn boot<'a>(
        &'a self,
        device: &'a Device,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if device.is_booted() {
                return Ok(());
            }
            self.run(&["boot", &device.udid], cancel).await?;

            // Bring the simulator window up; headless use works without it.
            let open = ToolCommand::new("open").with_args(["-a", "Simulator"]);
            if let Err(e) = self.executor.run_silent(&open, &[], cancel).await {
                debug!(error = %e, "could not open Simulator app");
            }
            Ok(())
        })
    }

    fn shutdown<'a>(
        &'a self,
        device: &'a Device,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if device.state == DeviceState::Shutdown {
                return Ok(());
            }
            self.run(&["shutdown", &device.udid], cancel).await?;
            Ok(())
        })
    }

    fn install<'a>(
        &'a self,
        device: &'a Device,
        app_path: &'a Path,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = app_path.display().to_string();
            self.run(&["install", &device.udid, &path], cancel).await?;
            Ok(())
        })
    }

    fn launch<'a>(
        &'a self,
        device: &'a Device,
        bundle_id: &'a str,
        args: &'a [String],
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Option<u32>>> {
        Box::pin(async move {
            let mut argv = vec!["launch".to_string(), device.udid.clone(), bundle_id.to_string()];
            argv.extend(args.iter().cloned());
            let output = self.executor.run_silent(&self.tool, &argv, cancel).await?;
            Ok(parse_launch_pid(&String::from_utf8_lossy(&output)))
        })
    }

    fn terminate<'a>(
        &'a self,
        device: &'a Device,
        bundle_id: &'a str,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.run(&["terminate", &device.udid, bundle_id], cancel)
                .await?;
            Ok(())
        })
    }
}

fn devices_from_listing(
    listing: DeviceListing,
    platform: Option<Platform>,
    booted_only: bool,
) -> Vec<Device> {
    let mut devices = Vec::new();

    for (runtime, entries) in listing.devices {
        let (runtime_platform, version) = parse_runtime(&runtime);
        if platform.is_some_and(|p| p != runtime_platform) {
            continue;
        }

        for raw in entries {
            if !raw.is_available {
                continue;
            }
            let state = DeviceState::from(raw.state.as_str());
            if booted_only && state != DeviceState::Booted {
                continue;
            }
            devices.push(Device {
                udid: raw.udid,
                name: raw.name,
                platform: runtime_platform,
                os_version: version.clone(),
                state,
            });
        }
    }

    devices
}

/// `com.example.App: 4242` -> `Some(4242)`.
pub fn parse_launch_pid(output: &str) -> Option<u32> {
    let (_, pid) = output.trim().split_once(": ")?;
    pid.trim().parse().ok()
}

/// Decode a `simctl list devices -j` document.
pub fn parse_device_listing(
    json: &[u8],
    platform: Option<Platform>,
    booted_only: bool,
) -> Result<Vec<Device>> {
    let listing: DeviceListing = serde_json::from_slice(json)?;
    Ok(devices_from_listing(listing, platform, booted_only))
}

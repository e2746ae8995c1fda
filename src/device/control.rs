// src/device/control.rs

//! Device lifecycle abstraction.
//!
//! The run orchestrator talks to a `DeviceControl` instead of shelling out
//! directly, so tests can substitute a fake that records calls.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::device::types::{find_device, Device};
use crate::errors::{Result, SimrunError};
use crate::types::{BoxFuture, Platform};

pub trait DeviceControl: Send + Sync {
    /// Available devices, optionally filtered by platform and booted state.
    fn list<'a>(
        &'a self,
        platform: Option<Platform>,
        booted_only: bool,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<Device>>>;

    /// Resolve a device by identifier or name.
    fn get<'a>(
        &'a self,
        name_or_id: &'a str,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Device>> {
        Box::pin(async move {
            let devices = self.list(None, false, cancel).await?;
            find_device(&devices, name_or_id)
                .cloned()
                .ok_or_else(|| SimrunError::NotFound(format!("device {name_or_id}")))
        })
    }

    fn boot<'a>(&'a self, device: &'a Device, cancel: &'a CancellationToken)
    -> BoxFuture<'a, Result<()>>;

    fn shutdown<'a>(
        &'a self,
        device: &'a Device,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>>;

    fn install<'a>(
        &'a self,
        device: &'a Device,
        app_path: &'a Path,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>>;

    /// Launch an installed app; yields its process id when reported.
    fn launch<'a>(
        &'a self,
        device: &'a Device,
        bundle_id: &'a str,
        args: &'a [String],
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Option<u32>>>;

    /// Stop a running app. Callers treat failure as "was not running".
    fn terminate<'a>(
        &'a self,
        device: &'a Device,
        bundle_id: &'a str,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>>;
}

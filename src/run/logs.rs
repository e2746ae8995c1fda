// src/run/logs.rs

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::device::Device;
use crate::errors::Result;
use crate::exec::{Executor, ProcessStream, ToolCommand};

/// Starts a persistent log stream for a launched app.
pub trait LogSource: Send + Sync {
    /// Begin streaming. The stream runs until `cancel` fires or the
    /// underlying source ends.
    fn start(
        &self,
        device: &Device,
        bundle_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessStream>;
}

/// The device's unified log, filtered to the app's process path.
#[derive(Debug, Clone)]
pub struct DeviceLogStreamer {
    executor: Executor,
    simctl: ToolCommand,
}

impl DeviceLogStreamer {
    pub fn new(executor: Executor, simctl: ToolCommand) -> Self {
        Self { executor, simctl }
    }

    pub fn stream_args(device: &Device, bundle_id: &str) -> Vec<String> {
        vec![
            "spawn".to_string(),
            device.udid.clone(),
            "log".to_string(),
            "stream".to_string(),
            "--style".to_string(),
            "compact".to_string(),
            "--predicate".to_string(),
            format!("processImagePath CONTAINS \"{bundle_id}\""),
        ]
    }
}

impl LogSource for DeviceLogStreamer {
    fn start(
        &self,
        device: &Device,
        bundle_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessStream> {
        let args = Self::stream_args(device, bundle_id);
        self.executor.execute(&self.simctl, &args, cancel)
    }
}

/// Forward every line of `stream` into `out` verbatim.
///
/// Returns when the stream ends or `out` is dropped. A stream that ended by
/// itself reports its terminal status; one cut short reports `Ok`.
pub async fn relay_lines(mut stream: ProcessStream, out: mpsc::UnboundedSender<String>) -> Result<()> {
    while let Some(line) = stream.next_line().await {
        if out.send(line.text).is_err() {
            debug!("log consumer went away; stopping relay");
            return Ok(());
        }
    }
    stream.finish().await
}

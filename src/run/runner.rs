// src/run/runner.rs

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::WatchSettings;
use crate::device::{Device, DeviceControl};
use crate::errors::{Result, SimrunError};
use crate::run::cycle::{resolve_device, Cycle, LaunchedApp};
use crate::run::logs::{relay_lines, LogSource};
use crate::run::watch_loop::WatchLoop;
use crate::types::Platform;
use crate::ui::Renderer;
use crate::watch::{spawn_watcher, WatchFilter};

/// How a `run` session behaves.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub platform: Platform,
    /// Device name or identifier; otherwise one is picked for `platform`.
    pub device: Option<String>,
    pub watch: bool,
    /// Directory watched for source changes.
    pub watch_root: PathBuf,
}

/// Top-level run session: resolve a device, run the first cycle, then
/// either stream logs once or supervise rebuilds.
pub struct Runner {
    devices: Arc<dyn DeviceControl>,
    cycle: Arc<dyn Cycle>,
    logs: Arc<dyn LogSource>,
    watch: WatchSettings,
    renderer: Renderer,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(
        devices: Arc<dyn DeviceControl>,
        cycle: Arc<dyn Cycle>,
        logs: Arc<dyn LogSource>,
        watch: WatchSettings,
        renderer: Renderer,
    ) -> Self {
        Self {
            devices,
            cycle,
            logs,
            watch,
            renderer,
        }
    }

    /// Run until the logs end or `cancel` fires. Application log lines are
    /// sent to `out`. Cancellation after the first launch is a clean exit.
    pub async fn run(
        &self,
        opts: &RunOptions,
        out: mpsc::UnboundedSender<String>,
        cancel: &CancellationToken,
    ) -> Result<LaunchedApp> {
        let mut device = resolve_device(
            self.devices.as_ref(),
            opts.platform,
            opts.device.as_deref(),
            cancel,
        )
        .await?;
        self.renderer
            .info(format_args!("Device: {} ({})", device.name, device.os_version));

        let app = self.cycle.run(&mut device, cancel).await?;

        if opts.watch {
            self.watch(opts, &mut device, app, out, cancel).await
        } else {
            self.stream_once(&device, app, out, cancel).await
        }
    }

    async fn stream_once(
        &self,
        device: &Device,
        app: LaunchedApp,
        out: mpsc::UnboundedSender<String>,
        cancel: &CancellationToken,
    ) -> Result<LaunchedApp> {
        self.renderer
            .dim(format_args!("Streaming logs (Ctrl+C to stop)..."));

        let stream = self.logs.start(device, &app.bundle_id, cancel)?;
        match relay_lines(stream, out).await {
            Ok(()) => Ok(app),
            Err(SimrunError::Cancelled) => Ok(app),
            Err(e) => Err(e.in_step("stream logs")),
        }
    }

    async fn watch(
        &self,
        opts: &RunOptions,
        device: &mut Device,
        app: LaunchedApp,
        out: mpsc::UnboundedSender<String>,
        cancel: &CancellationToken,
    ) -> Result<LaunchedApp> {
        let watch_cancel = cancel.child_token();
        let (handle, changes) = spawn_watcher(
            opts.watch_root.clone(),
            WatchFilter::from_settings(&self.watch),
            self.watch.debounce,
            watch_cancel.clone(),
        )?;
        info!(root = %handle.root().display(), directories = handle.directories(), "watching sources");

        let watch_loop = WatchLoop::new(
            Arc::clone(&self.cycle),
            Arc::clone(&self.logs),
            self.renderer.clone(),
            self.watch.grace,
            out,
        );
        let outcome = watch_loop.run(device, app, changes, cancel).await;

        watch_cancel.cancel();
        drop(handle);
        outcome
    }
}

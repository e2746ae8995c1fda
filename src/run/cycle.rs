// src/run/cycle.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::build::{BuildConfig, BuildEvent, Builder};
use crate::device::{Device, DeviceControl, DeviceState};
use crate::errors::{Result, SimrunError};
use crate::run::artifact::{ArtifactLocator, BundleInspector};
use crate::types::{BoxFuture, Configuration, Platform};
use crate::ui::Renderer;

/// Live build events buffered between the builder and the renderer.
const EVENT_BUFFER: usize = 100;

/// What a successful cycle left running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedApp {
    pub app_path: PathBuf,
    pub bundle_id: String,
    pub pid: Option<u32>,
}

/// One build -> install -> launch pass against a device.
///
/// Implementations update `device.state` when they boot it, so the next
/// pass does not boot it again.
pub trait Cycle: Send + Sync {
    fn run<'a>(
        &'a self,
        device: &'a mut Device,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<LaunchedApp>>;
}

/// Per-session inputs to the build cycle.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub scheme: Option<String>,
    pub configuration: Configuration,
    pub platform: Platform,
    pub derived_data: Option<PathBuf>,
    pub launch_args: Vec<String>,
}

/// The real cycle: build tool, artifact cache, manifest tool and simulator.
pub struct BuildCycle {
    builder: Builder,
    devices: Arc<dyn DeviceControl>,
    locator: ArtifactLocator,
    inspector: BundleInspector,
    settings: CycleSettings,
    renderer: Renderer,
}

impl std::fmt::Debug for BuildCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildCycle")
            .field("project", &self.builder.project().name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BuildCycle {
    pub fn new(
        builder: Builder,
        devices: Arc<dyn DeviceControl>,
        locator: ArtifactLocator,
        inspector: BundleInspector,
        settings: CycleSettings,
        renderer: Renderer,
    ) -> Self {
        Self {
            builder,
            devices,
            locator,
            inspector,
            settings,
            renderer,
        }
    }

    fn show_event(&self, event: &BuildEvent) {
        match event {
            BuildEvent::CompileFile { path } => {
                self.renderer.dim(format_args!("Compiling {}", file_name(path)));
            }
            BuildEvent::Error(d) => {
                self.renderer
                    .error(format_args!("{}:{}: {}", file_name(&d.file), d.line, d.message));
            }
            _ => {}
        }
    }

    async fn run_cycle(&self, device: &mut Device, cancel: &CancellationToken) -> Result<LaunchedApp> {
        let scheme = self.builder.effective_scheme(self.settings.scheme.as_deref());
        self.renderer.info(format_args!("Building {scheme}..."));

        let cfg = BuildConfig {
            scheme: Some(scheme.clone()),
            configuration: self.settings.configuration,
            platform: Some(self.settings.platform),
            destination: Some(device.destination()),
            derived_data: self.settings.derived_data.clone(),
            extra_args: Vec::new(),
        };

        let (tx, mut rx) = mpsc::channel::<BuildEvent>(EVENT_BUFFER);
        let build = async {
            let tx = tx;
            self.builder.build(&cfg, Some(&tx), cancel).await
        };
        let show = async {
            while let Some(event) = rx.recv().await {
                self.show_event(&event);
            }
        };
        let (outcome, ()) = tokio::join!(build, show);

        let result = outcome.map_err(|e| SimrunError::from(e).in_step("build"))?;
        if !result.succeeded {
            return Err(SimrunError::BuildFailed {
                errors: result.errors.len(),
            });
        }
        self.renderer
            .success(format_args!("Built in {:.1}s", result.duration.as_secs_f64()));

        let app_path = self
            .locator
            .find_app(
                &self.builder.project().name,
                &scheme,
                self.settings.configuration,
                self.settings.platform,
            )
            .map_err(|e| e.in_step("locate app"))?;
        debug!(app = %app_path.display(), "found application bundle");

        let bundle_id = self
            .inspector
            .bundle_identifier(&app_path, cancel)
            .await
            .map_err(|e| e.in_step("read bundle identifier"))?;

        if !device.is_booted() {
            self.renderer.info(format_args!("Booting {}...", device.name));
            self.devices
                .boot(device, cancel)
                .await
                .map_err(|e| e.in_step("boot"))?;
            device.state = DeviceState::Booted;
        }

        self.devices
            .install(device, &app_path, cancel)
            .await
            .map_err(|e| e.in_step("install"))?;

        // It may not be running.
        if let Err(e) = self.devices.terminate(device, &bundle_id, cancel).await {
            debug!(bundle_id = %bundle_id, error = %e, "terminate before relaunch failed");
        }

        let pid = self
            .devices
            .launch(device, &bundle_id, &self.settings.launch_args, cancel)
            .await
            .map_err(|e| e.in_step("launch"))?;

        match pid {
            Some(pid) => self.renderer.success(format_args!("Launched (PID {pid})")),
            None => self.renderer.success(format_args!("Launched")),
        }
        info!(bundle_id = %bundle_id, ?pid, "app launched");

        Ok(LaunchedApp {
            app_path,
            bundle_id,
            pid,
        })
    }
}

impl Cycle for BuildCycle {
    fn run<'a>(
        &'a self,
        device: &'a mut Device,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<LaunchedApp>> {
        Box::pin(self.run_cycle(device, cancel))
    }
}

/// Pick the device a session runs on.
///
/// An explicit name or identifier must resolve. Otherwise a booted device
/// of `platform` is preferred, then the first one listed.
pub async fn resolve_device(
    devices: &dyn DeviceControl,
    platform: Platform,
    requested: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Device> {
    if let Some(query) = requested {
        return devices.get(query, cancel).await;
    }

    let available = devices.list(Some(platform), false, cancel).await?;
    if let Some(booted) = available.iter().find(|d| d.is_booted()) {
        return Ok(booted.clone());
    }
    available
        .into_iter()
        .next()
        .ok_or_else(|| SimrunError::NotFound(format!("{platform} simulator (try: simrun devices list)")))
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

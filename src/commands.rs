// src/commands.rs

//! Subcommand handlers. Each wires the real collaborators together and
//! reports through the console renderer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::build::{BuildConfig, BuildEvent, BuildResult, Builder, Diagnostic};
use crate::cli::{BuildArgs, CliArgs, DevicesCommand, ProjectCommand, RunArgs};
use crate::config::{load_for_project, ConfigFile};
use crate::device::{Device, DeviceControl, Simctl};
use crate::errors::{Result, SimrunError};
use crate::exec::{command_exists, Executor};
use crate::project::{Detector, ProjectInfo};
use crate::run::{
    ArtifactLocator, BuildCycle, BundleInspector, CycleSettings, DeviceLogStreamer, RunOptions,
    Runner,
};
use crate::types::Platform;
use crate::ui::Renderer;

/// Errors listed after a failed `build`.
const MAX_REPORTED_ERRORS: usize = 5;

/// How long queued app log lines may take to print after a session ends.
const PRINTER_FLUSH: Duration = Duration::from_millis(500);

/// Everything a command needs that does not depend on the subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub project_dir: PathBuf,
    pub config: ConfigFile,
    pub renderer: Renderer,
    pub executor: Executor,
}

impl Context {
    pub fn load(args: &CliArgs) -> Result<Self> {
        let project_dir = std::env::current_dir()?;
        let config = load_for_project(args.config.as_deref(), &project_dir)?;
        let renderer = Renderer::new();
        let executor = Executor::new(args.verbose, renderer.clone());
        Ok(Self {
            project_dir,
            config,
            renderer,
            executor,
        })
    }

    fn simctl(&self) -> Simctl {
        Simctl::new(self.executor.clone(), self.config.device.simctl.clone())
    }

    async fn detect_project(&self, cancel: &CancellationToken) -> Result<ProjectInfo> {
        let tool = &self.config.build.tool;
        if !command_exists(tool.program()) {
            return Err(SimrunError::NotFound(format!(
                "build tool `{}` (is Xcode installed?)",
                tool.program()
            )));
        }
        Detector::new(self.executor.clone(), tool.clone())
            .detect(&self.project_dir, cancel)
            .await
    }
}

pub async fn run(ctx: &Context, args: RunArgs, cancel: &CancellationToken) -> Result<()> {
    if !args.platform.is_simulated() {
        return Err(SimrunError::Config(format!(
            "`run` targets simulators; {} apps can be built with `simrun build -p {}`",
            args.platform, args.platform
        )));
    }

    let project = ctx.detect_project(cancel).await?;
    ctx.renderer
        .info(format_args!("Project: {} ({})", project.name, project.kind));

    let devices: Arc<dyn DeviceControl> = Arc::new(ctx.simctl());
    let builder = Builder::new(project, ctx.config.build.tool.clone(), ctx.executor.clone());
    let cycle = BuildCycle::new(
        builder,
        Arc::clone(&devices),
        ArtifactLocator::from_settings(ctx.config.build.derived_data.as_deref())?,
        BundleInspector::new(ctx.executor.clone(), ctx.config.device.plist_tool.clone()),
        CycleSettings {
            scheme: args.scheme,
            configuration: args.configuration.unwrap_or(ctx.config.build.configuration),
            platform: args.platform,
            derived_data: ctx.config.build.derived_data.clone(),
            launch_args: args.args,
        },
        ctx.renderer.clone(),
    );
    let logs = DeviceLogStreamer::new(ctx.executor.clone(), ctx.config.device.simctl.clone());

    let runner = Runner::new(
        devices,
        Arc::new(cycle),
        Arc::new(logs),
        ctx.config.watch.clone(),
        ctx.renderer.clone(),
    );
    let opts = RunOptions {
        platform: args.platform,
        device: args.device.or_else(|| ctx.config.device.default_device.clone()),
        watch: args.watch,
        watch_root: ctx.project_dir.clone(),
    };

    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
    let printer = spawn_printer(out_rx, |line| println!("{line}"));

    let outcome = runner.run(&opts, out_tx, cancel).await;
    finish_printer(printer).await;
    outcome.map(|_| ())
}

/// Hand every relayed app log line to `emit` until all senders are gone.
pub fn spawn_printer<F>(mut lines: mpsc::UnboundedReceiver<String>, mut emit: F) -> JoinHandle<()>
where
    F: FnMut(String) + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            emit(line);
        }
    })
}

/// Let the printer drain what is already queued, then stop it.
pub async fn finish_printer(mut printer: JoinHandle<()>) {
    if tokio::time::timeout(PRINTER_FLUSH, &mut printer).await.is_err() {
        debug!("log printer still has live senders; stopping it");
        printer.abort();
    }
}

pub async fn build(ctx: &Context, args: BuildArgs, cancel: &CancellationToken) -> Result<()> {
    let project = ctx.detect_project(cancel).await?;
    let builder = Builder::new(project, ctx.config.build.tool.clone(), ctx.executor.clone());

    let cfg = BuildConfig {
        scheme: Some(builder.effective_scheme(args.scheme.as_deref())),
        configuration: args.configuration.unwrap_or(ctx.config.build.configuration),
        platform: args.platform,
        destination: args.destination,
        derived_data: ctx.config.build.derived_data.clone(),
        extra_args: Vec::new(),
    };

    if args.clean {
        ctx.renderer.info(format_args!("Cleaning..."));
        builder.clean(&cfg, cancel).await?;
    }

    ctx.renderer.info(format_args!(
        "Building {} ({})...",
        cfg.scheme.as_deref().unwrap_or_default(),
        cfg.configuration
    ));

    let (tx, mut rx) = mpsc::channel::<BuildEvent>(100);
    let renderer = ctx.renderer.clone();
    let show = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let BuildEvent::CompileFile { path } = event {
                renderer.dim(format_args!("Compiling {path}"));
            }
        }
    });

    let outcome = builder.build(&cfg, Some(&tx), cancel).await;
    drop(tx);
    let _ = show.await;

    match outcome {
        Ok(result) if result.succeeded => {
            ctx.renderer.success(format_args!(
                "Build succeeded in {:.1}s ({} warnings)",
                result.duration.as_secs_f64(),
                result.warnings.len()
            ));
            Ok(())
        }
        Ok(result) => {
            report_errors(&ctx.renderer, &result);
            Err(SimrunError::BuildFailed {
                errors: result.errors.len(),
            })
        }
        Err(err) => {
            report_errors(&ctx.renderer, &err.result);
            Err(err.into())
        }
    }
}

fn report_errors(renderer: &Renderer, result: &BuildResult) {
    renderer.error(format_args!("Build failed with {} error(s)", result.errors.len()));
    for d in result.errors.iter().take(MAX_REPORTED_ERRORS) {
        renderer.info(format_args!("{}", format_diagnostic(d)));
    }
    if result.errors.len() > MAX_REPORTED_ERRORS {
        renderer.dim(format_args!(
            "... and {} more",
            result.errors.len() - MAX_REPORTED_ERRORS
        ));
    }
}

/// `file:line:column: message`.
pub fn format_diagnostic(d: &Diagnostic) -> String {
    format!("{}:{}:{}: {}", d.file, d.line, d.column, d.message)
}

pub async fn devices(ctx: &Context, cmd: DevicesCommand, cancel: &CancellationToken) -> Result<()> {
    let simctl = ctx.simctl();

    match cmd {
        DevicesCommand::List {
            platform,
            booted,
            json,
        } => {
            let devices = simctl.list(platform, booted, cancel).await?;
            if json {
                return print_json(&devices);
            }
            if devices.is_empty() {
                ctx.renderer.dim(format_args!("No simulators found"));
            }
            print_devices(&devices);
        }
        DevicesCommand::Boot { device } => {
            let device = simctl.get(&device, cancel).await?;
            if device.is_booted() {
                ctx.renderer
                    .info(format_args!("{} is already booted", device.name));
                return Ok(());
            }
            simctl.boot(&device, cancel).await?;
            ctx.renderer.success(format_args!("Booted {}", device.name));
        }
        DevicesCommand::Shutdown { device } => match device.as_deref() {
            None | Some("all") => {
                simctl.shutdown_all(cancel).await?;
                ctx.renderer.success(format_args!("Shut down all simulators"));
            }
            Some(query) => {
                let device = simctl.get(query, cancel).await?;
                simctl.shutdown(&device, cancel).await?;
                ctx.renderer.success(format_args!("Shut down {}", device.name));
            }
        },
        DevicesCommand::Create {
            name,
            device_type,
            runtime,
        } => {
            let type_id = simctl.resolve_device_type(&device_type, cancel).await?;
            let runtime_id = simctl.resolve_runtime(&runtime, cancel).await?;
            let udid = simctl.create(&name, &type_id, &runtime_id, cancel).await?;
            ctx.renderer.success(format_args!("Created {name} ({udid})"));
        }
        DevicesCommand::Delete { device } => {
            let device = simctl.get(&device, cancel).await?;
            simctl.delete(&device, cancel).await?;
            ctx.renderer.success(format_args!("Deleted {}", device.name));
        }
        DevicesCommand::Types { platform } => {
            for t in simctl.list_device_types(cancel).await? {
                if platform.is_some_and(|p| p != t.platform) {
                    continue;
                }
                println!("{:<40} {}", t.name, t.identifier);
            }
        }
        DevicesCommand::Runtimes { platform } => {
            for r in simctl.list_runtimes(cancel).await? {
                if platform.is_some_and(|p| p != r.platform) {
                    continue;
                }
                let availability = if r.is_available { "" } else { " (unavailable)" };
                println!("{:<24} {}{availability}", r.name, r.identifier);
            }
        }
    }

    Ok(())
}

fn print_devices(devices: &[Device]) {
    let mut current: Option<(Platform, &str)> = None;
    for d in devices {
        let group = (d.platform, d.os_version.as_str());
        if current != Some(group) {
            println!("{} {}", d.platform.destination_name(), d.os_version);
            current = Some(group);
        }
        println!("  {:<32} {:<12} {}", d.name, d.state.as_str(), d.udid);
    }
}

pub async fn project(ctx: &Context, cmd: ProjectCommand, cancel: &CancellationToken) -> Result<()> {
    let ProjectCommand::Info { json } = cmd;
    let info = ctx.detect_project(cancel).await?;

    if json {
        return print_json(&info);
    }

    println!("Name:      {}", info.name);
    println!("Kind:      {}", info.kind);
    println!("Path:      {}", info.path.display());
    let platforms: Vec<String> = info.platforms.iter().map(|p| p.to_string()).collect();
    println!("Platforms: {}", platforms.join(", "));
    if !info.schemes.is_empty() {
        println!("Schemes:");
        for s in &info.schemes {
            println!("  {s}");
        }
    }
    if !info.targets.is_empty() {
        println!("Targets:");
        for t in &info.targets {
            match &t.product_type {
                Some(kind) => println!("  {} ({kind})", t.name),
                None => println!("  {}", t.name),
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

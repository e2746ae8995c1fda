// src/lib.rs

pub mod build;
pub mod cli;
pub mod commands;
pub mod config;
pub mod device;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod project;
pub mod run;
pub mod types;
pub mod ui;
pub mod watch;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::commands::Context;
use crate::errors::Result;

/// High-level entry point used by `main.rs`.
///
/// Loads the project configuration, installs Ctrl-C handling and
/// dispatches the subcommand. The first Ctrl-C cancels the root token so
/// running processes are killed and the command unwinds; a second one exits
/// immediately.
pub async fn run(args: CliArgs) -> Result<()> {
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let ctx = Context::load(&args)?;
    debug!(dir = %ctx.project_dir.display(), verbose = args.verbose, "starting command");

    match args.command {
        Command::Run(run_args) => commands::run(&ctx, run_args, &cancel).await,
        Command::Build(build_args) => commands::build(&ctx, build_args, &cancel).await,
        Command::Devices(cmd) => commands::devices(&ctx, cmd, &cancel).await,
        Command::Project(cmd) => commands::project(&ctx, cmd, &cancel).await,
    }
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(1);
        }
    });
}

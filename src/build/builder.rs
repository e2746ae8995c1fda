// src/build/builder.rs

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::build::parser::OutputParser;
use crate::build::{BuildConfig, BuildError, BuildEvent, BuildResult};
use crate::errors::Result;
use crate::exec::{Executor, ToolCommand};
use crate::project::{ProjectInfo, ProjectKind};

/// Runs the build driver for one project.
#[derive(Debug, Clone)]
pub struct Builder {
    project: ProjectInfo,
    tool: ToolCommand,
    executor: Executor,
}

impl Builder {
    pub fn new(project: ProjectInfo, tool: ToolCommand, executor: Executor) -> Self {
        Self {
            project,
            tool,
            executor,
        }
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    /// Explicit scheme, else the project's first scheme, else its name.
    pub fn effective_scheme(&self, explicit: Option<&str>) -> String {
        explicit
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.project.schemes.first().cloned())
            .unwrap_or_else(|| self.project.name.clone())
    }

    /// Arguments passed to the build tool (after its fixed prefix).
    pub fn build_args(&self, cfg: &BuildConfig) -> Vec<String> {
        let mut args = Vec::new();

        match self.project.kind {
            ProjectKind::Workspace => {
                args.push("-workspace".to_string());
                args.push(self.project.path.display().to_string());
            }
            ProjectKind::Project => {
                args.push("-project".to_string());
                args.push(self.project.path.display().to_string());
            }
            ProjectKind::Package => {}
        }

        let scheme = cfg
            .scheme
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| self.project.schemes.first().cloned());
        if let Some(scheme) = scheme {
            args.push("-scheme".to_string());
            args.push(scheme);
        }

        args.push("-configuration".to_string());
        args.push(cfg.configuration.as_tool_arg().to_string());

        let destination = cfg
            .destination
            .clone()
            .or_else(|| cfg.platform.map(|p| p.default_destination().to_string()));
        if let Some(destination) = destination {
            args.push("-destination".to_string());
            args.push(destination);
        }

        if let Some(ref dd) = cfg.derived_data {
            args.push("-derivedDataPath".to_string());
            args.push(dd.display().to_string());
        }

        args.extend(cfg.extra_args.iter().cloned());
        args
    }

    /// Build, streaming parsed events to `events` when given.
    ///
    /// Returns once the process has exited and its output is fully parsed.
    /// A build that ran but reported errors comes back as `Ok` with
    /// `succeeded == false`; a process failure comes back as [`BuildError`].
    pub async fn build(
        &self,
        cfg: &BuildConfig,
        events: Option<&mpsc::Sender<BuildEvent>>,
        cancel: &CancellationToken,
    ) -> std::result::Result<BuildResult, BuildError> {
        let started = Instant::now();
        let args = self.build_args(cfg);
        info!(project = %self.project.name, ?cfg.scheme, "starting build");

        let mut stream = self
            .executor
            .execute(&self.tool, &args, cancel)
            .map_err(|source| BuildError {
                result: BuildResult::default(),
                source,
            })?;

        let mut parser = OutputParser::new();
        while let Some(line) = stream.next_line().await {
            let Some(event) = parser.parse_line(&line.text) else {
                continue;
            };
            debug!(?event, "build event");
            if let Some(tx) = events {
                // A consumer that went away just stops observing.
                let _ = tx.send(event).await;
            }
        }

        let mut result = parser.into_result();
        result.duration = started.elapsed();

        match stream.finish().await {
            Ok(()) => {
                info!(
                    succeeded = result.succeeded,
                    errors = result.errors.len(),
                    warnings = result.warnings.len(),
                    elapsed_ms = result.duration.as_millis() as u64,
                    "build finished"
                );
                Ok(result)
            }
            Err(source) => {
                result.succeeded = false;
                Err(BuildError { result, source })
            }
        }
    }

    /// Run the tool's `clean` action with the same arguments.
    pub async fn clean(&self, cfg: &BuildConfig, cancel: &CancellationToken) -> Result<()> {
        let mut args = self.build_args(cfg);
        args.push("clean".to_string());
        self.executor.run_silent(&self.tool, &args, cancel).await?;
        Ok(())
    }
}

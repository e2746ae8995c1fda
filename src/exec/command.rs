// src/exec/command.rs

use std::path::Path;
use std::process::Stdio;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, SimrunError};
use crate::exec::output::{OutputLine, OutputOrigin, ProcessStream};
use crate::exec::tool::ToolCommand;
use crate::ui::Renderer;

/// Buffered lines per process before readers wait on the consumer.
const LINE_BUFFER: usize = 100;

/// Runs external commands.
///
/// `verbose` is fixed at construction: when set, every invocation is echoed
/// through the renderer before it starts.
#[derive(Debug, Clone)]
pub struct Executor {
    verbose: bool,
    renderer: Renderer,
}

impl Executor {
    pub fn new(verbose: bool, renderer: Renderer) -> Self {
        Self { verbose, renderer }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn log_command(&self, tool: &ToolCommand, args: &[String]) {
        if self.verbose {
            self.renderer.command(tool.program(), &tool.argv_with(args));
        }
    }

    /// Start `tool args...` and stream its output.
    ///
    /// Spawning happens before this returns, so a missing program fails here
    /// with [`SimrunError::Startup`]. Afterwards:
    ///
    /// - two reader tasks forward stdout/stderr lines into one channel;
    /// - once both readers are done the process is reaped;
    /// - a non-zero exit is reported once on `errors`.
    ///
    /// When `cancel` fires the readers stop forwarding, the process is killed
    /// and `errors` carries [`SimrunError::Cancelled`].
    pub fn execute(
        &self,
        tool: &ToolCommand,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<ProcessStream> {
        self.log_command(tool, args);
        let command_line = tool.display_with(args);

        let mut child = Command::new(tool.program())
            .args(tool.argv_with(args))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SimrunError::Startup {
                command: command_line.clone(),
                source,
            })?;

        debug!(command = %command_line, pid = ?child.id(), "process started");

        let (line_tx, line_rx) = mpsc::channel::<OutputLine>(LINE_BUFFER);
        let (err_tx, err_rx) = mpsc::channel::<SimrunError>(1);

        let readers = [
            spawn_reader(
                child.stdout.take(),
                OutputOrigin::Stdout,
                line_tx.clone(),
                cancel.clone(),
            ),
            spawn_reader(
                child.stderr.take(),
                OutputOrigin::Stderr,
                line_tx,
                cancel.clone(),
            ),
        ];

        let cancel = cancel.clone();
        tokio::spawn(async move {
            // Both pipes must be drained before the exit status is read.
            for reader in readers {
                if let Err(e) = reader.await {
                    warn!(command = %command_line, error = %e, "output reader task failed");
                }
            }

            let outcome = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(command = %command_line, "cancellation requested; killing process");
                    if let Err(e) = child.kill().await {
                        warn!(command = %command_line, error = %e, "failed to kill process on cancellation");
                    }
                    Err(SimrunError::Cancelled)
                }

                status = child.wait() => match status {
                    Ok(status) if status.success() => Ok(()),
                    Ok(status) => Err(SimrunError::Execution {
                        command: command_line.clone(),
                        code: status.code(),
                        stderr: String::new(),
                    }),
                    Err(e) => Err(SimrunError::Io(e)),
                },
            };

            match outcome {
                Ok(()) => debug!(command = %command_line, "process exited successfully"),
                Err(err) => {
                    debug!(command = %command_line, error = %err, "process finished with error");
                    // Capacity 1 and a single send: never blocks.
                    let _ = err_tx.try_send(err);
                }
            }
        });

        Ok(ProcessStream {
            lines: line_rx,
            errors: err_rx,
        })
    }

    /// Run `tool args...` to completion and return its stdout.
    ///
    /// For short-lived commands whose output is only useful as a whole. On a
    /// non-zero exit the captured stderr is folded into the error.
    pub async fn run_silent(
        &self,
        tool: &ToolCommand,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        self.log_command(tool, args);
        let command_line = tool.display_with(args);

        let mut cmd = Command::new(tool.program());
        cmd.args(tool.argv_with(args))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SimrunError::Cancelled),
            output = cmd.output() => output.map_err(|source| SimrunError::Startup {
                command: command_line.clone(),
                source,
            })?,
        };

        if !output.status.success() {
            return Err(SimrunError::Execution {
                command: command_line,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }

    /// [`run_silent`](Self::run_silent) and decode stdout as JSON.
    pub async fn run_json<T: DeserializeOwned>(
        &self,
        tool: &ToolCommand,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<T> {
        let output = self.run_silent(tool, args, cancel).await?;
        Ok(serde_json::from_slice(&output)?)
    }
}

/// Whether `name` resolves to an executable, either as a path or via `PATH`.
pub fn command_exists(name: &str) -> bool {
    let path = Path::new(name);
    if path.components().count() > 1 {
        return path.is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(name).is_file()))
        .unwrap_or(false)
}

fn spawn_reader<R>(
    pipe: Option<R>,
    origin: OutputOrigin,
    tx: mpsc::Sender<OutputLine>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(pipe) = pipe else {
            return;
        };

        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        // Once the consumer hangs up we keep draining so the child never
        // blocks on a full pipe, but stop forwarding.
        let mut forwarding = true;

        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => break,
                Ok(_) => {
                    if !forwarding {
                        continue;
                    }
                    let line = OutputLine {
                        origin,
                        text: trim_newline(&buf),
                    };
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        sent = tx.send(line) => {
                            if sent.is_err() {
                                forwarding = false;
                            }
                        }
                    }
                }
                Err(e) => {
                    debug!(?origin, error = %e, "error reading process output");
                    break;
                }
            }
        }
    })
}

fn trim_newline(buf: &[u8]) -> String {
    let mut end = buf.len();
    while end > 0 && (buf[end - 1] == b'\n' || buf[end - 1] == b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

// src/run/watch_loop.rs

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::errors::Result;
use crate::run::cycle::{Cycle, LaunchedApp};
use crate::run::logs::{relay_lines, LogSource};
use crate::ui::Renderer;
use crate::watch::ChangeEvent;

/// State of one watch session.
///
/// Owned by the loop alone. At most one log stream is attached at a time:
/// the previous one is cancelled before a new one is recorded.
#[derive(Debug)]
pub struct RunSession {
    app: LaunchedApp,
    log_cancel: Option<CancellationToken>,
}

impl RunSession {
    pub fn new(app: LaunchedApp) -> Self {
        Self {
            app,
            log_cancel: None,
        }
    }

    pub fn app(&self) -> &LaunchedApp {
        &self.app
    }

    pub fn is_streaming(&self) -> bool {
        self.log_cancel.is_some()
    }

    fn stop_logs(&mut self) {
        if let Some(token) = self.log_cancel.take() {
            token.cancel();
        }
    }
}

/// Rebuilds and relaunches on every debounced source change.
pub struct WatchLoop {
    cycle: Arc<dyn Cycle>,
    logs: Arc<dyn LogSource>,
    renderer: Renderer,
    grace: Duration,
    out: mpsc::UnboundedSender<String>,
}

impl std::fmt::Debug for WatchLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchLoop")
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

impl WatchLoop {
    /// `out` receives relayed application log lines.
    pub fn new(
        cycle: Arc<dyn Cycle>,
        logs: Arc<dyn LogSource>,
        renderer: Renderer,
        grace: Duration,
        out: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            cycle,
            logs,
            renderer,
            grace,
            out,
        }
    }

    /// Supervise the session until `cancel` fires or `changes` closes.
    ///
    /// Each change stops the log stream, runs one full cycle to completion
    /// and then restarts streaming. A failed cycle leaves the previous app
    /// running and streaming resumes against it. Changes queued while the
    /// cycle ran, and any arriving within the grace window after it, are
    /// discarded; with a zero grace they are handled one cycle at a time.
    /// Returns the app the session ended with.
    pub async fn run(
        &self,
        device: &mut Device,
        app: LaunchedApp,
        mut changes: mpsc::Receiver<ChangeEvent>,
        cancel: &CancellationToken,
    ) -> Result<LaunchedApp> {
        let mut session = RunSession::new(app);
        self.start_logs(&mut session, device, cancel);
        self.renderer
            .dim(format_args!("Watching for changes (Ctrl+C to stop)..."));

        loop {
            let change = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                change = changes.recv() => match change {
                    Some(change) => change,
                    None => {
                        info!("change stream closed; leaving watch loop");
                        break;
                    }
                },
            };

            self.renderer
                .info(format_args!("Changed: {}", display_name(&change.path)));
            session.stop_logs();

            match self.cycle.run(device, cancel).await {
                Ok(app) => {
                    info!(bundle_id = %app.bundle_id, "rebuild succeeded");
                    session.app = app;
                }
                Err(e) if e.is_cancelled() => break,
                Err(e) => {
                    warn!(error = %e, "rebuild failed; keeping previous app");
                    self.renderer.error(format_args!("Rebuild failed: {e}"));
                }
            }

            drain(&mut changes, self.grace, cancel).await;
            if cancel.is_cancelled() {
                break;
            }

            self.start_logs(&mut session, device, cancel);
        }

        session.stop_logs();
        Ok(session.app)
    }

    fn start_logs(&self, session: &mut RunSession, device: &Device, cancel: &CancellationToken) {
        session.stop_logs();

        let token = cancel.child_token();
        match self.logs.start(device, &session.app.bundle_id, &token) {
            Ok(stream) => {
                let out = self.out.clone();
                let bundle_id = session.app.bundle_id.clone();
                tokio::spawn(async move {
                    match relay_lines(stream, out).await {
                        Ok(()) => debug!(bundle_id = %bundle_id, "log stream ended"),
                        Err(e) if e.is_cancelled() => debug!(bundle_id = %bundle_id, "log stream stopped"),
                        Err(e) => warn!(bundle_id = %bundle_id, error = %e, "log stream failed"),
                    }
                });
            }
            Err(e) => {
                self.renderer
                    .warning(format_args!("Log streaming unavailable: {e}"));
            }
        }

        session.log_cancel = Some(token);
    }
}

/// Discard changes arriving within `grace`, including any already queued.
/// A zero grace discards nothing.
pub async fn drain(changes: &mut mpsc::Receiver<ChangeEvent>, grace: Duration, cancel: &CancellationToken) {
    if grace.is_zero() {
        return;
    }
    let deadline = sleep(grace);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = &mut deadline => return,
            change = changes.recv() => match change {
                Some(change) => debug!(path = %change.path.display(), "discarding change within grace window"),
                None => return,
            },
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

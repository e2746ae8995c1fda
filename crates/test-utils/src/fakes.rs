//! In-memory stand-ins for the run orchestrator's collaborators.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use simrun::device::{Device, DeviceControl, DeviceState};
use simrun::errors::{Result, SimrunError};
use simrun::exec::{OutputLine, OutputOrigin, ProcessStream};
use simrun::run::{Cycle, LaunchedApp, LogSource};
use simrun::types::{BoxFuture, Platform};
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::launched;

/// Device control that records every call as `"<op>:<udid>[:<arg>]"`.
#[derive(Clone, Default)]
pub struct FakeDevices {
    devices: Arc<Mutex<Vec<Device>>>,
    calls: Arc<Mutex<Vec<String>>>,
    fail_install: Arc<Mutex<bool>>,
}

impl FakeDevices {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices: Arc::new(Mutex::new(devices)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_install(&self, fail: bool) {
        *self.fail_install.lock().unwrap() = fail;
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DeviceControl for FakeDevices {
    fn list<'a>(
        &'a self,
        platform: Option<Platform>,
        booted_only: bool,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<Device>>> {
        Box::pin(async move {
            Ok(self
                .devices
                .lock()
                .unwrap()
                .iter()
                .filter(|d| platform.is_none_or(|p| p == d.platform))
                .filter(|d| !booted_only || d.is_booted())
                .cloned()
                .collect())
        })
    }

    fn boot<'a>(&'a self, device: &'a Device, _cancel: &'a CancellationToken) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("boot:{}", device.udid));
            for d in self.devices.lock().unwrap().iter_mut() {
                if d.udid == device.udid {
                    d.state = DeviceState::Booted;
                }
            }
            Ok(())
        })
    }

    fn shutdown<'a>(
        &'a self,
        device: &'a Device,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("shutdown:{}", device.udid));
            Ok(())
        })
    }

    fn install<'a>(
        &'a self,
        device: &'a Device,
        app_path: &'a Path,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("install:{}:{}", device.udid, app_path.display()));
            if *self.fail_install.lock().unwrap() {
                return Err(SimrunError::Execution {
                    command: "simctl install".to_string(),
                    code: Some(1),
                    stderr: "install failed".to_string(),
                });
            }
            Ok(())
        })
    }

    fn launch<'a>(
        &'a self,
        device: &'a Device,
        bundle_id: &'a str,
        args: &'a [String],
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Option<u32>>> {
        Box::pin(async move {
            let mut call = format!("launch:{}:{bundle_id}", device.udid);
            for a in args {
                call.push(':');
                call.push_str(a);
            }
            self.record(call);
            Ok(Some(4242))
        })
    }

    fn terminate<'a>(
        &'a self,
        device: &'a Device,
        bundle_id: &'a str,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("terminate:{}:{bundle_id}", device.udid));
            // Nothing is ever running in the fake.
            Err(SimrunError::Execution {
                command: "simctl terminate".to_string(),
                code: Some(3),
                stderr: "found nothing to terminate".to_string(),
            })
        })
    }
}

/// A scripted build cycle.
///
/// Each run pops the next scripted outcome (`Ok(bundle_id)` or a failure);
/// once the script is exhausted runs succeed with `com.example.app`. When
/// gated, every run waits for a permit from [`FakeCycle::release`].
#[derive(Clone)]
pub struct FakeCycle {
    script: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    gate: Option<Arc<Semaphore>>,
    started: Arc<Notify>,
    runs: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl FakeCycle {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            gate: None,
            started: Arc::new(Notify::new()),
            runs: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Runs block until released.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub fn then_succeed(self, bundle_id: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(bundle_id.to_string()));
        self
    }

    pub fn then_fail(self, reason: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
        self
    }

    /// Let `n` gated runs proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Resolves once a run has started (one stored wake-up per start).
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Default for FakeCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Cycle for FakeCycle {
    fn run<'a>(
        &'a self,
        device: &'a mut Device,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<LaunchedApp>> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.started.notify_one();

            let outcome = async {
                if let Some(gate) = &self.gate {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(SimrunError::Cancelled),
                        permit = gate.acquire() => {
                            permit.map_err(|e| SimrunError::Other(e.into()))?.forget();
                        }
                    }
                }

                device.state = DeviceState::Booted;
                let next = self.script.lock().unwrap().pop_front();
                match next {
                    Some(Ok(bundle_id)) => Ok(launched(&bundle_id)),
                    Some(Err(reason)) => Err(SimrunError::Step {
                        step: "build",
                        source: Box::new(SimrunError::Other(anyhow::anyhow!(reason))),
                    }),
                    None => Ok(launched("com.example.app")),
                }
            }
            .await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            outcome
        })
    }
}

/// A log source that records which bundle ids streams were started for.
///
/// Each stream emits the configured lines, then stays open until its token
/// is cancelled.
#[derive(Clone, Default)]
pub struct FakeLogSource {
    lines: Arc<Mutex<Vec<String>>>,
    started: Arc<Mutex<Vec<String>>>,
    tokens: Arc<Mutex<Vec<CancellationToken>>>,
    max_live: Arc<AtomicUsize>,
}

impl FakeLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(lines: &[&str]) -> Self {
        let source = Self::default();
        *source.lines.lock().unwrap() = lines.iter().map(|l| l.to_string()).collect();
        source
    }

    /// Bundle ids in start order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Streams whose token has not been cancelled.
    pub fn live(&self) -> usize {
        self.tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.is_cancelled())
            .count()
    }

    /// Most streams ever live at once, counted at each start.
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

impl LogSource for FakeLogSource {
    fn start(
        &self,
        _device: &Device,
        bundle_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessStream> {
        self.started.lock().unwrap().push(bundle_id.to_string());
        self.tokens.lock().unwrap().push(cancel.clone());
        self.max_live.fetch_max(self.live(), Ordering::SeqCst);

        let (line_tx, line_rx) = mpsc::channel(16);
        let (err_tx, err_rx) = mpsc::channel(1);
        let lines = self.lines.lock().unwrap().clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            for text in lines {
                let line = OutputLine {
                    origin: OutputOrigin::Stdout,
                    text,
                };
                if line_tx.send(line).await.is_err() {
                    break;
                }
            }
            cancel.cancelled().await;
            drop(line_tx);
            let _ = err_tx.try_send(SimrunError::Cancelled);
        });

        Ok(ProcessStream {
            lines: line_rx,
            errors: err_rx,
        })
    }
}

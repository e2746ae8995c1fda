// tests/watch_loop.rs

mod common;
use crate::common::fakes::{FakeCycle, FakeLogSource};
use crate::common::{init_tracing, ios_device, launched, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use simrun::device::DeviceState;
use simrun::errors::Result;
use simrun::run::{drain, LaunchedApp, WatchLoop};
use simrun::ui::Renderer;
use simrun::watch::ChangeEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const FIRST: &str = "com.example.first";
const GRACE: Duration = Duration::from_millis(100);

fn change(name: &str) -> ChangeEvent {
    ChangeEvent {
        path: PathBuf::from("/work/Sources").join(name),
        timestamp: SystemTime::now(),
    }
}

/// Let every spawned task run until it is idle.
async fn settle() {
    sleep(Duration::from_secs(1)).await;
}

fn spawn_loop(
    cycle: &FakeCycle,
    logs: &FakeLogSource,
    grace: Duration,
    changes: mpsc::Receiver<ChangeEvent>,
    cancel: &CancellationToken,
) -> (JoinHandle<Result<LaunchedApp>>, mpsc::UnboundedReceiver<String>) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let watch_loop = WatchLoop::new(
        Arc::new(cycle.clone()),
        Arc::new(logs.clone()),
        Renderer::quiet(),
        grace,
        out_tx,
    );
    let cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        let mut device = ios_device("iPhone 15", "AAAA-1111", DeviceState::Booted);
        watch_loop
            .run(&mut device, launched(FIRST), changes, &cancel)
            .await
    });
    (handle, out_rx)
}

#[tokio::test(start_paused = true)]
async fn test_change_during_build_waits_for_cycle_to_finish() {
    init_tracing();
    let cycle = FakeCycle::gated();
    let logs = FakeLogSource::new();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(4);
    let (task, _out) = spawn_loop(&cycle, &logs, Duration::ZERO, rx, &cancel);

    tx.send(change("A.swift")).await.unwrap();
    with_timeout(cycle.wait_started()).await;

    tx.send(change("B.swift")).await.unwrap();
    settle().await;
    assert_eq!(cycle.runs(), 1, "second cycle started while the first was running");

    cycle.release(1);
    with_timeout(cycle.wait_started()).await;
    assert_eq!(cycle.runs(), 2);

    cycle.release(1);
    settle().await;
    cancel.cancel();
    with_timeout(task).await.unwrap().unwrap();

    assert_eq!(cycle.max_concurrent(), 1);
    assert_eq!(logs.max_live(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_rebuild_resumes_logs_for_previous_app() {
    init_tracing();
    let cycle = FakeCycle::new().then_fail("Foo.swift:3: error: missing return");
    let logs = FakeLogSource::new();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(4);
    let (task, _out) = spawn_loop(&cycle, &logs, GRACE, rx, &cancel);

    tx.send(change("Foo.swift")).await.unwrap();
    settle().await;

    assert_eq!(cycle.runs(), 1);
    assert_eq!(logs.started(), vec![FIRST, FIRST]);
    assert_eq!(logs.live(), 1);

    cancel.cancel();
    let app = with_timeout(task).await.unwrap().unwrap();
    assert_eq!(app.bundle_id, FIRST);
    assert_eq!(logs.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_successful_rebuild_switches_log_stream() {
    let cycle = FakeCycle::new().then_succeed("com.example.second");
    let logs = FakeLogSource::new();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(4);
    let (task, _out) = spawn_loop(&cycle, &logs, GRACE, rx, &cancel);

    tx.send(change("View.swift")).await.unwrap();
    settle().await;

    assert_eq!(logs.started(), vec![FIRST, "com.example.second"]);
    assert_eq!(logs.max_live(), 1);

    cancel.cancel();
    let app = with_timeout(task).await.unwrap().unwrap();
    assert_eq!(app.bundle_id, "com.example.second");
}

#[tokio::test(start_paused = true)]
async fn test_changes_queued_during_build_are_discarded_with_grace() {
    let cycle = FakeCycle::gated();
    let logs = FakeLogSource::new();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(4);
    let (task, _out) = spawn_loop(&cycle, &logs, GRACE, rx, &cancel);

    tx.send(change("A.swift")).await.unwrap();
    with_timeout(cycle.wait_started()).await;
    // Churn written while the build runs.
    tx.send(change("A.swift")).await.unwrap();
    tx.send(change("B.swift")).await.unwrap();
    cycle.release(1);
    settle().await;
    assert_eq!(cycle.runs(), 1);

    // A change after the grace window still triggers a rebuild.
    tx.send(change("C.swift")).await.unwrap();
    with_timeout(cycle.wait_started()).await;
    assert_eq!(cycle.runs(), 2);

    cancel.cancel();
    with_timeout(task).await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_cycle_ends_session() {
    let cycle = FakeCycle::gated();
    let logs = FakeLogSource::new();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(4);
    let (task, _out) = spawn_loop(&cycle, &logs, GRACE, rx, &cancel);

    tx.send(change("A.swift")).await.unwrap();
    with_timeout(cycle.wait_started()).await;
    cancel.cancel();

    let app = with_timeout(task).await.unwrap().unwrap();
    assert_eq!(app.bundle_id, FIRST);
    assert_eq!(cycle.runs(), 1);
    assert_eq!(logs.started(), vec![FIRST]);
    assert_eq!(logs.live(), 0);
}

#[tokio::test]
async fn test_loop_ends_when_change_stream_closes() {
    let cycle = FakeCycle::new();
    let logs = FakeLogSource::new();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(4);
    let (task, _out) = spawn_loop(&cycle, &logs, GRACE, rx, &cancel);

    drop(tx);
    let app = with_timeout(task).await.unwrap().unwrap();

    assert_eq!(app.bundle_id, FIRST);
    assert_eq!(cycle.runs(), 0);
    assert_eq!(logs.live(), 0);
}

#[tokio::test]
async fn test_log_lines_are_relayed() {
    let cycle = FakeCycle::new();
    let logs = FakeLogSource::with_lines(&["hello", "world"]);
    let cancel = CancellationToken::new();
    let (_tx, rx) = mpsc::channel(4);
    let (task, mut out) = spawn_loop(&cycle, &logs, GRACE, rx, &cancel);

    assert_eq!(with_timeout(out.recv()).await.as_deref(), Some("hello"));
    assert_eq!(with_timeout(out.recv()).await.as_deref(), Some("world"));

    cancel.cancel();
    with_timeout(task).await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_drain_discards_queued_changes() {
    let (tx, mut rx) = mpsc::channel(4);
    tx.send(change("A.swift")).await.unwrap();
    tx.send(change("B.swift")).await.unwrap();

    drain(&mut rx, GRACE, &CancellationToken::new()).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_zero_grace_keeps_queued_changes() {
    let (tx, mut rx) = mpsc::channel(4);
    tx.send(change("A.swift")).await.unwrap();

    drain(&mut rx, Duration::ZERO, &CancellationToken::new()).await;
    assert_eq!(rx.try_recv().unwrap().path, PathBuf::from("/work/Sources/A.swift"));
}

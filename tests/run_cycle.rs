// tests/run_cycle.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::fakes::{FakeCycle, FakeDevices, FakeLogSource};
use crate::common::{init_tracing, ios_device, quiet_executor, sh_tool, strings, with_timeout, write_script};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use simrun::build::Builder;
use simrun::config::ConfigFile;
use simrun::device::{Device, DeviceState};
use simrun::errors::SimrunError;
use simrun::project::{ProjectInfo, ProjectKind};
use simrun::run::{
    resolve_device, ArtifactLocator, BuildCycle, BundleInspector, Cycle, CycleSettings, RunOptions,
    Runner,
};
use simrun::types::{Configuration, Platform};
use simrun::ui::Renderer;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const UDID: &str = "AAAA-1111";

fn tv_device() -> Device {
    Device {
        udid: "TTTT-1111".to_string(),
        name: "Apple TV".to_string(),
        platform: Platform::Tvos,
        os_version: "17.2".to_string(),
        state: DeviceState::Booted,
    }
}

// ---- device resolution ----

#[tokio::test]
async fn test_explicit_device_must_resolve() {
    let devices = FakeDevices::new(vec![
        ios_device("iPhone 15", UDID, DeviceState::Shutdown),
        ios_device("iPhone 15 Pro", "AAAA-2222", DeviceState::Booted),
    ]);
    let cancel = CancellationToken::new();

    let d = resolve_device(&devices, Platform::Ios, Some("iPhone 15"), &cancel)
        .await
        .unwrap();
    assert_eq!(d.udid, UDID);

    let err = resolve_device(&devices, Platform::Ios, Some("Pixel"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SimrunError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_booted_device_of_platform_preferred() {
    let devices = FakeDevices::new(vec![
        tv_device(),
        ios_device("iPhone 15", UDID, DeviceState::Shutdown),
        ios_device("iPhone 15 Pro", "AAAA-2222", DeviceState::Booted),
    ]);
    let cancel = CancellationToken::new();

    let d = resolve_device(&devices, Platform::Ios, None, &cancel).await.unwrap();
    assert_eq!(d.udid, "AAAA-2222");
}

#[tokio::test]
async fn test_first_device_when_none_booted() {
    let devices = FakeDevices::new(vec![
        ios_device("iPhone 15", UDID, DeviceState::Shutdown),
        ios_device("iPhone SE", "AAAA-3333", DeviceState::Shutdown),
    ]);
    let cancel = CancellationToken::new();

    let d = resolve_device(&devices, Platform::Ios, None, &cancel).await.unwrap();
    assert_eq!(d.udid, UDID);
}

#[tokio::test]
async fn test_no_device_for_platform() {
    let devices = FakeDevices::new(vec![tv_device()]);
    let cancel = CancellationToken::new();

    let err = resolve_device(&devices, Platform::Watchos, None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SimrunError::NotFound(_)), "got {err:?}");
    assert!(err.to_string().contains("simrun devices list"));
}

// ---- full cycle against stand-in tools ----

struct Fixture {
    _dir: tempfile::TempDir,
    app: PathBuf,
    cycle: BuildCycle,
    devices: FakeDevices,
}

/// A derived-data directory holding `App.app`, a build tool that succeeds
/// only for the device's destination, and a manifest tool.
fn fixture(build_script: &str) -> Fixture {
    let dir = tempdir().unwrap();
    let dd = dir.path().join("DerivedData");
    let app = dd.join("Build/Products/Debug-iphonesimulator/App.app");
    fs::create_dir_all(&app).unwrap();

    let xcodebuild = write_script(dir.path(), "xcodebuild.sh", build_script);
    let plist = write_script(dir.path(), "plist.sh", "echo com.example.App\n");

    let mut project = ProjectInfo::new(ProjectKind::Project, "/work/App.xcodeproj", "App");
    project.schemes = strings(&["App"]);

    let devices = FakeDevices::new(vec![ios_device("iPhone 15", UDID, DeviceState::Shutdown)]);
    let cycle = BuildCycle::new(
        Builder::new(project, sh_tool(&xcodebuild), quiet_executor()),
        Arc::new(devices.clone()),
        ArtifactLocator::for_derived_data(&dd),
        BundleInspector::new(quiet_executor(), sh_tool(&plist)),
        CycleSettings {
            scheme: None,
            configuration: Configuration::Debug,
            platform: Platform::Ios,
            derived_data: Some(dd.clone()),
            launch_args: strings(&["-reset"]),
        },
        Renderer::quiet(),
    );

    Fixture {
        _dir: dir,
        app,
        cycle,
        devices,
    }
}

const SUCCEEDING_BUILD: &str = r#"case "$*" in
  *"-destination platform=iOS Simulator,id=AAAA-1111"*) ;;
  *) echo "unexpected destination" 1>&2; exit 7 ;;
esac
echo "CompileSwift normal arm64 /work/Sources/App.swift"
echo "** BUILD SUCCEEDED **"
"#;

fn call_on(op: &str, rest: &str) -> String {
    format!("{op}:{UDID}:{rest}")
}

#[cfg(unix)]
#[tokio::test]
async fn test_cycle_boots_installs_and_relaunches() {
    init_tracing();
    let fx = fixture(SUCCEEDING_BUILD);
    let cancel = CancellationToken::new();
    let mut device = ios_device("iPhone 15", UDID, DeviceState::Shutdown);

    let launched = with_timeout(fx.cycle.run(&mut device, &cancel)).await.unwrap();

    assert_eq!(launched.app_path, fx.app);
    assert_eq!(launched.bundle_id, "com.example.App");
    assert_eq!(launched.pid, Some(4242));
    assert!(device.is_booted());
    assert_eq!(
        fx.devices.calls(),
        vec![
            format!("boot:{UDID}"),
            call_on("install", &fx.app.display().to_string()),
            call_on("terminate", "com.example.App"),
            call_on("launch", "com.example.App:-reset"),
        ]
    );

    // The device is booted now; the next pass skips straight to install.
    with_timeout(fx.cycle.run(&mut device, &cancel)).await.unwrap();
    let boots = fx.devices.calls().iter().filter(|c| c.starts_with("boot:")).count();
    assert_eq!(boots, 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_compile_errors_stop_before_install() {
    let fx = fixture(
        r#"echo "/work/Sources/App.swift:12:5: error: cannot find 'foo' in scope"
echo "/work/Sources/App.swift:20:1: error: expected '}'"
echo "** BUILD FAILED **"
"#,
    );
    let cancel = CancellationToken::new();
    let mut device = ios_device("iPhone 15", UDID, DeviceState::Booted);

    let err = with_timeout(fx.cycle.run(&mut device, &cancel)).await.unwrap_err();

    assert!(matches!(err, SimrunError::BuildFailed { errors: 2 }), "got {err:?}");
    assert!(fx.devices.calls().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_build_tool_failure_names_build_step() {
    let fx = fixture("echo 'xcodebuild: error: unknown scheme' 1>&2\nexit 65\n");
    let cancel = CancellationToken::new();
    let mut device = ios_device("iPhone 15", UDID, DeviceState::Booted);

    let err = with_timeout(fx.cycle.run(&mut device, &cancel)).await.unwrap_err();
    assert!(matches!(err, SimrunError::Step { step: "build", .. }), "got {err:?}");
}

#[cfg(unix)]
#[tokio::test]
async fn test_install_failure_names_install_step() {
    let fx = fixture(SUCCEEDING_BUILD);
    fx.devices.fail_install(true);
    let cancel = CancellationToken::new();
    let mut device = ios_device("iPhone 15", UDID, DeviceState::Booted);

    let err = with_timeout(fx.cycle.run(&mut device, &cancel)).await.unwrap_err();

    assert!(matches!(err, SimrunError::Step { step: "install", .. }), "got {err:?}");
    assert!(err.to_string().contains("install"));
    assert!(!fx.devices.calls().iter().any(|c| c.starts_with("launch:")));
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_bundle_names_locate_step() {
    let fx = fixture(SUCCEEDING_BUILD);
    fs::remove_dir_all(&fx.app).unwrap();
    let cancel = CancellationToken::new();
    let mut device = ios_device("iPhone 15", UDID, DeviceState::Booted);

    let err = with_timeout(fx.cycle.run(&mut device, &cancel)).await.unwrap_err();
    assert!(matches!(err, SimrunError::Step { step: "locate app", .. }), "got {err:?}");
}

// ---- runner ----

fn runner(devices: FakeDevices, cycle: &FakeCycle, logs: &FakeLogSource, watch: &ConfigFile) -> Runner {
    Runner::new(
        Arc::new(devices),
        Arc::new(cycle.clone()),
        Arc::new(logs.clone()),
        watch.watch.clone(),
        Renderer::quiet(),
    )
}

fn options(watch: bool, root: &Path) -> RunOptions {
    RunOptions {
        platform: Platform::Ios,
        device: None,
        watch,
        watch_root: root.to_path_buf(),
    }
}

#[tokio::test]
async fn test_one_shot_run_streams_until_cancelled() {
    let cycle = FakeCycle::new().then_succeed("com.example.App");
    let logs = FakeLogSource::with_lines(&["app started"]);
    let devices = FakeDevices::new(vec![ios_device("iPhone 15", UDID, DeviceState::Booted)]);
    let runner = runner(devices, &cycle, &logs, &ConfigFile::default());
    let cancel = CancellationToken::new();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();

    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            runner
                .run(&options(false, Path::new(".")), out_tx, &cancel)
                .await
        })
    };

    assert_eq!(with_timeout(out_rx.recv()).await.as_deref(), Some("app started"));
    cancel.cancel();

    let app = with_timeout(task).await.unwrap().unwrap();
    assert_eq!(app.bundle_id, "com.example.App");
    assert_eq!(cycle.runs(), 1);
    assert_eq!(logs.started(), vec!["com.example.App"]);
}

#[tokio::test]
async fn test_run_without_devices_fails_before_building() {
    let cycle = FakeCycle::new();
    let logs = FakeLogSource::new();
    let runner = runner(FakeDevices::new(vec![tv_device()]), &cycle, &logs, &ConfigFile::default());
    let (out_tx, _out_rx) = mpsc::unbounded_channel();

    let err = runner
        .run(&options(false, Path::new(".")), out_tx, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SimrunError::NotFound(_)), "got {err:?}");
    assert_eq!(cycle.runs(), 0);
}

#[tokio::test]
async fn test_watch_mode_rebuilds_on_source_change() {
    init_tracing();
    let root = tempdir().unwrap();
    fs::create_dir(root.path().join("Sources")).unwrap();
    let source = root.path().join("Sources/App.swift");
    fs::write(&source, "struct App {}\n").unwrap();

    let cycle = FakeCycle::new()
        .then_succeed("com.example.first")
        .then_succeed("com.example.second");
    let logs = FakeLogSource::new();
    let devices = FakeDevices::new(vec![ios_device("iPhone 15", UDID, DeviceState::Shutdown)]);
    let config = ConfigFileBuilder::new().debounce_ms(50).grace_ms(0).build();
    let runner = runner(devices, &cycle, &logs, &config);
    let cancel = CancellationToken::new();
    let (out_tx, _out_rx) = mpsc::unbounded_channel();

    let task = {
        let cancel = cancel.clone();
        let opts = options(true, root.path());
        tokio::spawn(async move { runner.run(&opts, out_tx, &cancel).await })
    };

    // Keep touching the file until the watcher is registered and a
    // rebuild has gone through.
    with_timeout(async {
        let mut edit = 0;
        while cycle.runs() < 2 {
            edit += 1;
            fs::write(&source, format!("struct App {{ let v = {edit} }}\n")).unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
    .await;

    cancel.cancel();
    let app = with_timeout(task).await.unwrap().unwrap();
    assert_ne!(app.bundle_id, "com.example.first");
    assert_eq!(&logs.started()[..2], &["com.example.first", "com.example.second"]);
    assert_eq!(logs.live(), 0);
}

pub mod builders;
pub mod fakes;

use std::path::PathBuf;
use std::sync::Once;

use simrun::device::{Device, DeviceState};
use simrun::run::LaunchedApp;
use simrun::types::Platform;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// An iOS simulator descriptor.
pub fn ios_device(name: &str, udid: &str, state: DeviceState) -> Device {
    Device {
        udid: udid.to_string(),
        name: name.to_string(),
        platform: Platform::Ios,
        os_version: "17.2".to_string(),
        state,
    }
}

/// A launched app with the given bundle identifier.
pub fn launched(bundle_id: &str) -> LaunchedApp {
    LaunchedApp {
        app_path: PathBuf::from(format!("/tmp/{bundle_id}.app")),
        bundle_id: bundle_id.to_string(),
        pid: Some(4242),
    }
}

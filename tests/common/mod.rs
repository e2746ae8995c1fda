#![allow(dead_code)]

pub use simrun_test_utils::builders;
pub use simrun_test_utils::fakes;
pub use simrun_test_utils::{init_tracing, ios_device, launched, with_timeout};

use std::fs;
use std::path::{Path, PathBuf};

use simrun::exec::{Executor, ToolCommand};
use simrun::ui::Renderer;

/// Write a shell script stand-in for an external tool.
///
/// Scripts are run as `sh <path>` rather than executed directly, so no
/// permission bits are needed.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    path
}

/// A tool invocation that runs `script` through `sh`.
pub fn sh_tool(script: &Path) -> ToolCommand {
    ToolCommand::new("sh").with_args([script.display().to_string()])
}

/// An executor that prints nothing.
pub fn quiet_executor() -> Executor {
    Executor::new(false, Renderer::quiet())
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

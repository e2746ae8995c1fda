// src/run/mod.rs

//! Build -> boot -> install -> launch -> logs, once or under a watch loop.
//!
//! The collaborators the orchestration talks to sit behind traits
//! ([`Cycle`], [`LogSource`], and [`crate::device::DeviceControl`]) so the
//! loop's ordering and cancellation can be tested without a toolchain.

pub mod artifact;
pub mod cycle;
pub mod logs;
pub mod runner;
pub mod watch_loop;

pub use artifact::{ArtifactLocator, BundleInspector};
pub use cycle::{resolve_device, BuildCycle, Cycle, CycleSettings, LaunchedApp};
pub use logs::{relay_lines, DeviceLogStreamer, LogSource};
pub use runner::{RunOptions, Runner};
pub use watch_loop::{drain, RunSession, WatchLoop};

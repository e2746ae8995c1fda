// src/watch/mod.rs

//! Source change detection.
//!
//! Walks the project tree once, registers a watch per directory and turns
//! bursts of editor saves into single debounced [`ChangeEvent`]s. It knows
//! nothing about building; the run loop decides what a change means.

use std::path::PathBuf;
use std::time::SystemTime;

pub mod debounce;
pub mod filter;
pub mod walker;
pub mod watcher;

pub use debounce::debounce;
pub use filter::{is_relevant_kind, WatchFilter};
pub use walker::{register_tree, WatchRegistry};
pub use watcher::{forward_relevant, spawn_watcher, WatcherHandle};

/// A debounced source change: the last path seen in the burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub timestamp: SystemTime,
}

// src/watch/walker.rs

use std::fs;
use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::watch::filter::WatchFilter;

/// Something directories can be registered with for change notification.
pub trait WatchRegistry {
    fn add_dir(&mut self, dir: &Path) -> notify::Result<()>;
}

impl WatchRegistry for RecommendedWatcher {
    fn add_dir(&mut self, dir: &Path) -> notify::Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
    }
}

/// Register `root` and every non-skipped subdirectory, depth first.
///
/// A directory that cannot be read or watched is logged and skipped; the
/// walk carries on with its siblings. Symlinked directories are not
/// followed. Returns the number of directories registered.
pub fn register_tree<R: WatchRegistry>(root: &Path, filter: &WatchFilter, registry: &mut R) -> usize {
    let mut registered = 0;
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if let Err(e) = registry.add_dir(&dir) {
            warn!(dir = %dir.display(), error = %e, "could not watch directory; skipping");
            continue;
        }
        registered += 1;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "could not read directory");
                continue;
            }
        };

        let mut children = Vec::new();
        for entry in entries.flatten() {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let name = entry.file_name();
            if filter.should_skip_dir_name(&name.to_string_lossy()) {
                debug!(dir = %entry.path().display(), "skipping ignored directory");
                continue;
            }
            children.push(entry.path());
        }

        // Reverse so the stack pops children in name order.
        children.sort();
        stack.extend(children.into_iter().rev());
    }

    registered
}

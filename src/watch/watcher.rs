// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::errors::{Result, SimrunError};
use crate::watch::debounce::debounce;
use crate::watch::filter::{is_relevant_kind, WatchFilter};
use crate::watch::walker::register_tree;
use crate::watch::ChangeEvent;

/// Debounced changes are handed over one at a time.
const CHANGE_BUFFER: usize = 1;

/// Handle for a running change watcher.
///
/// Keeps the `RecommendedWatcher` alive. Dropping the handle releases every
/// directory watch, which closes the notify channel and lets the filter and
/// debounce tasks finish.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
    directories: usize,
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of directories registered at startup.
    pub fn directories(&self) -> usize {
        self.directories
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .field("directories", &self.directories)
            .finish()
    }
}

/// Start watching the source tree under `root`.
///
/// Every directory present now (minus the skipped ones) is registered
/// individually; directories created later are not picked up. Qualifying
/// changes are debounced over `window` and delivered on the returned
/// receiver, which closes once `cancel` fires or the handle is dropped.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    filter: WatchFilter,
    window: Duration,
    cancel: CancellationToken,
) -> Result<(WatcherHandle, mpsc::Receiver<ChangeEvent>)> {
    let root = root.into();
    let root = std::path::absolute(&root).unwrap_or(root);
    if !root.is_dir() {
        return Err(SimrunError::NotFound(format!(
            "watch root {}",
            root.display()
        )));
    }

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Receiver gone means the watcher is shutting down.
                let _ = event_tx.send(event);
            }
            Err(err) => {
                tracing::warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .map_err(|e| SimrunError::Other(e.into()))?;

    let directories = register_tree(&root, &filter, &mut watcher);
    info!(root = %root.display(), directories, "file watcher started");

    let (path_tx, path_rx) = mpsc::unbounded_channel::<PathBuf>();
    let (change_tx, change_rx) = mpsc::channel::<ChangeEvent>(CHANGE_BUFFER);

    tokio::spawn(forward_relevant(
        event_rx,
        root.clone(),
        filter,
        path_tx,
        cancel.clone(),
    ));
    tokio::spawn(debounce(path_rx, change_tx, window, cancel));

    Ok((
        WatcherHandle {
            _inner: watcher,
            root,
            directories,
        },
        change_rx,
    ))
}

/// Pass on the paths of notify events that should trigger a rebuild.
pub async fn forward_relevant(
    mut events: mpsc::UnboundedReceiver<Event>,
    root: PathBuf,
    filter: WatchFilter,
    paths: mpsc::UnboundedSender<PathBuf>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        trace!(?event, "received notify event");
        if !is_relevant_kind(&event.kind) {
            continue;
        }

        for path in event.paths {
            if !filter.is_relevant_path(&root, &path) {
                continue;
            }
            debug!(path = %path.display(), "source change");
            if paths.send(path).is_err() {
                return;
            }
        }
    }

    debug!("watcher event loop finished");
}

// src/watch/debounce.rs

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::watch::ChangeEvent;

/// Coalesce bursts of qualifying paths into single [`ChangeEvent`]s.
///
/// There is one pending slot: each incoming path overwrites the recorded
/// path and pushes the deadline out to `window` from now. When the deadline
/// passes with no new input, one event carrying the last path is emitted.
/// Intermediate paths are discarded.
///
/// Runs until `cancel` fires, `input` closes, or `output` is dropped. A
/// pending change at that point is dropped.
pub async fn debounce(
    mut input: mpsc::UnboundedReceiver<PathBuf>,
    output: mpsc::Sender<ChangeEvent>,
    window: Duration,
    cancel: CancellationToken,
) {
    let mut pending: Option<PathBuf> = None;
    let timer = sleep(window);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            next = input.recv() => match next {
                Some(path) => {
                    debug!(path = %path.display(), "change recorded; debounce timer reset");
                    pending = Some(path);
                    timer.as_mut().reset(Instant::now() + window);
                }
                None => break,
            },

            _ = &mut timer, if pending.is_some() => {
                let Some(path) = pending.take() else {
                    continue;
                };
                let event = ChangeEvent {
                    path,
                    timestamp: SystemTime::now(),
                };
                debug!(path = %event.path.display(), "debounce window elapsed; emitting change");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = output.send(event) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    debug!("debouncer finished");
}

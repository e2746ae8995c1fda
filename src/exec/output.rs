// src/exec/output.rs

use tokio::sync::mpsc;

use crate::errors::{Result, SimrunError};

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOrigin {
    Stdout,
    Stderr,
}

/// One line of process output, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub origin: OutputOrigin,
    pub text: String,
}

/// Consumer side of a running process.
///
/// `lines` yields stdout and stderr lines (each pipe in its own order, the
/// two interleaved arbitrarily) and closes once both pipes are drained.
/// `errors` carries at most one terminal failure, sent only after `lines`
/// has closed, and then closes too. A clean exit closes it empty.
#[derive(Debug)]
pub struct ProcessStream {
    pub lines: mpsc::Receiver<OutputLine>,
    pub errors: mpsc::Receiver<SimrunError>,
}

impl ProcessStream {
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        self.lines.recv().await
    }

    /// Drain any remaining output and wait for the terminal signal.
    pub async fn finish(mut self) -> Result<()> {
        while self.lines.recv().await.is_some() {}
        match self.errors.recv().await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

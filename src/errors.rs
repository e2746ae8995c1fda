// src/errors.rs

//! Crate-wide error type.
//!
//! Best-effort operations (terminating a previous app instance, draining
//! stale change notifications) never produce one of these; their failures
//! are logged and dropped at the call site.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimrunError {
    /// The external command could not be launched at all.
    #[error("failed to start `{command}`: {source}")]
    Startup {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external command ran and exited unsuccessfully.
    #[error("`{command}` exited with {}{}", exit_label(.code), stderr_suffix(.stderr))]
    Execution {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The build tool ran fine but reported compilation errors.
    #[error("build failed with {errors} error(s)")]
    BuildFailed { errors: usize },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation cancelled")]
    Cancelled,

    /// A run-cycle step failed; `step` names which one.
    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<SimrunError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimrunError {
    /// Wrap `self` as the failure of a named run-cycle step.
    pub fn in_step(self, step: &'static str) -> Self {
        match self {
            // Cancellation stays recognisable no matter where it surfaced.
            SimrunError::Cancelled => SimrunError::Cancelled,
            other => SimrunError::Step {
                step,
                source: Box::new(other),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SimrunError::Cancelled)
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

pub type Result<T> = std::result::Result<T, SimrunError>;

// src/build/mod.rs

//! Building projects with the external build driver.
//!
//! - [`parser`] turns raw output lines into [`BuildEvent`]s and a
//!   [`BuildResult`].
//! - [`builder`] wires one parser to one streaming process invocation.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::SimrunError;
use crate::types::{Configuration, Platform};

pub mod builder;
pub mod parser;

pub use builder::Builder;
pub use parser::OutputParser;

/// A compiler warning or error location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Live progress of a build. Purely observational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    CompileFile { path: String },
    Link { target: String },
    Sign { target: String },
    Warning(Diagnostic),
    Error(Diagnostic),
    Success,
    Failure,
}

/// Outcome of one build invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub succeeded: bool,
    pub duration: Duration,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

/// What to build and for where.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    pub scheme: Option<String>,
    pub configuration: Configuration,
    pub platform: Option<Platform>,
    /// Explicit destination; otherwise the platform default is used.
    pub destination: Option<String>,
    pub derived_data: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

/// The build process itself failed (non-zero exit, or cancelled).
///
/// `result` holds whatever was parsed before the failure, with
/// `succeeded` forced to false.
#[derive(Debug, thiserror::Error)]
#[error("build failed: {source}")]
pub struct BuildError {
    pub result: BuildResult,
    #[source]
    pub source: SimrunError,
}

impl BuildError {
    pub fn is_cancelled(&self) -> bool {
        self.source.is_cancelled()
    }
}

impl From<BuildError> for SimrunError {
    fn from(err: BuildError) -> Self {
        err.source
    }
}

// src/project/mod.rs

//! Project descriptors and detection.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::types::Platform;

pub mod detector;

pub use detector::Detector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Workspace,
    Project,
    /// A package manifest (`Package.swift`).
    Package,
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectKind::Workspace => "workspace",
            ProjectKind::Project => "xcodeproj",
            ProjectKind::Package => "spm",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub platform: Option<Platform>,
    pub product_type: Option<String>,
}

/// Read-only description of the project being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub kind: ProjectKind,
    pub path: PathBuf,
    pub name: String,
    pub schemes: Vec<String>,
    pub platforms: Vec<Platform>,
    pub targets: Vec<Target>,
}

impl ProjectInfo {
    /// A descriptor with no introspected schemes, targets or platforms.
    pub fn new(kind: ProjectKind, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            name: name.into(),
            schemes: Vec::new(),
            platforms: Vec::new(),
            targets: Vec::new(),
        }
    }
}

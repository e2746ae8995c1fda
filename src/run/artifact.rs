// src/run/artifact.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Result, SimrunError};
use crate::exec::{Executor, ToolCommand};
use crate::types::{Configuration, Platform};

/// Where built products live.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ArtifactRoot {
    /// The build tool's shared cache: one `<Project>-<hash>` directory per
    /// project, the newest of which is used.
    Cache(PathBuf),
    /// A dedicated output directory passed to the build as
    /// `-derivedDataPath`.
    Direct(PathBuf),
}

/// Finds the application bundle produced by a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    root: ArtifactRoot,
}

impl ArtifactLocator {
    pub fn for_cache(root: impl Into<PathBuf>) -> Self {
        Self {
            root: ArtifactRoot::Cache(root.into()),
        }
    }

    pub fn for_derived_data(dir: impl Into<PathBuf>) -> Self {
        Self {
            root: ArtifactRoot::Direct(dir.into()),
        }
    }

    /// The configured output directory if any, else the user's shared cache.
    pub fn from_settings(derived_data: Option<&Path>) -> Result<Self> {
        match derived_data {
            Some(dir) => Ok(Self::for_derived_data(dir)),
            None => default_cache_root()
                .map(Self::for_cache)
                .ok_or_else(|| SimrunError::Config("cannot determine the home directory".to_string())),
        }
    }

    /// Path of the newest matching `.app` bundle.
    ///
    /// Fails with [`SimrunError::NotFound`] when the cache holds nothing for
    /// the project or the products directory holds no bundle. Among several
    /// bundles, the one named after `scheme` wins.
    pub fn find_app(
        &self,
        project_name: &str,
        scheme: &str,
        configuration: Configuration,
        platform: Platform,
    ) -> Result<PathBuf> {
        let project_dir = match &self.root {
            ArtifactRoot::Direct(dir) => dir.clone(),
            ArtifactRoot::Cache(root) => newest_project_dir(root, project_name)?,
        };

        let products = project_dir
            .join("Build")
            .join("Products")
            .join(products_dir_name(configuration, platform));
        debug!(dir = %products.display(), "searching for application bundle");

        let mut apps: Vec<PathBuf> = fs::read_dir(&products)
            .map_err(|_| SimrunError::NotFound(format!("build products in {}", products.display())))?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "app"))
            .collect();
        apps.sort();

        if let Some(app) = apps.iter().find(|p| p.file_stem().is_some_and(|s| s == scheme)) {
            return Ok(app.clone());
        }
        apps.into_iter()
            .next()
            .ok_or_else(|| SimrunError::NotFound(format!(".app bundle in {}", products.display())))
    }
}

/// `~/Library/Developer/Xcode/DerivedData`.
pub fn default_cache_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("Library")
            .join("Developer")
            .join("Xcode")
            .join("DerivedData")
    })
}

/// `Debug-iphonesimulator`, or just `Debug` for macOS products.
pub fn products_dir_name(configuration: Configuration, platform: Platform) -> String {
    match platform {
        Platform::Macos => configuration.as_tool_arg().to_string(),
        other => format!("{}-{}", configuration.as_tool_arg(), other.simulator_sdk()),
    }
}

fn newest_project_dir(root: &Path, project_name: &str) -> Result<PathBuf> {
    let prefix = format!("{project_name}-");
    let not_found = || SimrunError::NotFound(format!("build output for {project_name} in {}", root.display()));

    let entries = fs::read_dir(root).map_err(|_| not_found())?;

    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if best.as_ref().is_none_or(|(t, _)| modified > *t) {
            best = Some((modified, entry.path()));
        }
    }

    best.map(|(_, path)| path).ok_or_else(not_found)
}

/// Reads `CFBundleIdentifier` from a bundle's `Info.plist`.
#[derive(Debug, Clone)]
pub struct BundleInspector {
    executor: Executor,
    tool: ToolCommand,
}

impl BundleInspector {
    pub fn new(executor: Executor, tool: ToolCommand) -> Self {
        Self { executor, tool }
    }

    pub async fn bundle_identifier(&self, app: &Path, cancel: &CancellationToken) -> Result<String> {
        let plist = app.join("Info.plist");
        let args = vec![
            "-c".to_string(),
            "Print :CFBundleIdentifier".to_string(),
            plist.display().to_string(),
        ];
        let output = self.executor.run_silent(&self.tool, &args, cancel).await?;
        let id = String::from_utf8_lossy(&output).trim().to_string();
        if id.is_empty() {
            return Err(SimrunError::NotFound(format!(
                "bundle identifier in {}",
                plist.display()
            )));
        }
        Ok(id)
    }
}

// src/project/detector.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Result, SimrunError};
use crate::exec::{Executor, ToolCommand};
use crate::project::{ProjectInfo, ProjectKind, Target};
use crate::types::Platform;

#[derive(Debug, Default, Deserialize)]
struct ListOutput {
    #[serde(default)]
    project: Option<ListSection>,
    #[serde(default)]
    workspace: Option<ListSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ListSection {
    #[serde(default)]
    schemes: Vec<String>,
    #[serde(default)]
    targets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PackageDescription {
    name: String,
    #[serde(default)]
    products: Vec<PackageProduct>,
    #[serde(default)]
    targets: Vec<PackageTarget>,
}

#[derive(Debug, Deserialize)]
struct PackageProduct {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PackageTarget {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Finds the project in a directory. Priority: workspace > project > package.
#[derive(Debug, Clone)]
pub struct Detector {
    executor: Executor,
    build_tool: ToolCommand,
    package_tool: ToolCommand,
}

impl Detector {
    pub fn new(executor: Executor, build_tool: ToolCommand) -> Self {
        Self {
            executor,
            build_tool,
            package_tool: ToolCommand::new("swift"),
        }
    }

    pub async fn detect(&self, dir: &Path, cancel: &CancellationToken) -> Result<ProjectInfo> {
        let dir = std::path::absolute(dir)?;

        if let Some(path) = first_with_extension(&dir, "xcworkspace")? {
            let mut info = ProjectInfo::new(ProjectKind::Workspace, &path, stem(&path));
            self.populate_schemes(&mut info, cancel).await;
            return Ok(info);
        }

        if let Some(path) = first_with_extension(&dir, "xcodeproj")? {
            let mut info = ProjectInfo::new(ProjectKind::Project, &path, stem(&path));
            self.populate_schemes(&mut info, cancel).await;
            return Ok(info);
        }

        let manifest = dir.join("Package.swift");
        if manifest.is_file() {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut info = ProjectInfo::new(ProjectKind::Package, manifest, name);
            info.platforms = vec![Platform::Macos];
            self.populate_package(&mut info, &dir, cancel).await;
            return Ok(info);
        }

        Err(SimrunError::NotFound(format!(
            "no Swift project found in {}",
            dir.display()
        )))
    }

    /// Introspection failures leave the lists empty.
    async fn populate_schemes(&self, info: &mut ProjectInfo, cancel: &CancellationToken) {
        let flag = match info.kind {
            ProjectKind::Workspace => "-workspace",
            ProjectKind::Project => "-project",
            ProjectKind::Package => return,
        };
        let args = vec![
            flag.to_string(),
            info.path.display().to_string(),
            "-list".to_string(),
            "-json".to_string(),
        ];

        let listing: ListOutput = match self.executor.run_json(&self.build_tool, &args, cancel).await {
            Ok(l) => l,
            Err(e) => {
                debug!(error = %e, "project listing failed; schemes unknown");
                return;
            }
        };

        if info.kind == ProjectKind::Workspace {
            info.schemes = listing.workspace.unwrap_or_default().schemes;
        } else {
            let section = listing.project.unwrap_or_default();
            info.schemes = section.schemes;
            info.targets = section
                .targets
                .into_iter()
                .map(|name| Target {
                    name,
                    platform: None,
                    product_type: None,
                })
                .collect();
        }

        info.platforms = infer_platforms(&info.schemes);
    }

    async fn populate_package(&self, info: &mut ProjectInfo, dir: &Path, cancel: &CancellationToken) {
        let args = vec![
            "package".to_string(),
            "--package-path".to_string(),
            dir.display().to_string(),
            "describe".to_string(),
            "--type".to_string(),
            "json".to_string(),
        ];

        let pkg: PackageDescription =
            match self.executor.run_json(&self.package_tool, &args, cancel).await {
                Ok(p) => p,
                Err(e) => {
                    debug!(error = %e, "package description failed");
                    return;
                }
            };

        info.name = pkg.name;
        info.schemes = pkg.products.into_iter().map(|p| p.name).collect();
        info.targets = pkg
            .targets
            .into_iter()
            .map(|t| Target {
                name: t.name,
                platform: Some(Platform::Macos),
                product_type: t.kind,
            })
            .collect();
    }
}

/// Guess platforms from scheme names; iOS when nothing matches.
pub fn infer_platforms(schemes: &[String]) -> Vec<Platform> {
    let mut platforms = Vec::new();

    for scheme in schemes {
        let s = scheme.to_lowercase();
        let platform = if s.contains("ios") {
            Platform::Ios
        } else if s.contains("mac") {
            Platform::Macos
        } else if s.contains("watch") {
            Platform::Watchos
        } else if s.contains("tvos") {
            Platform::Tvos
        } else if s.contains("vision") {
            Platform::Visionos
        } else {
            continue;
        };
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }

    if platforms.is_empty() {
        platforms.push(Platform::Ios);
    }
    platforms
}

fn first_with_extension(dir: &Path, ext: &str) -> Result<Option<PathBuf>> {
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    matches.sort();
    Ok(matches.into_iter().next())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

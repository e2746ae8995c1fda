// tests/project_detection.rs
#![cfg(unix)]

mod common;
use crate::common::{quiet_executor, sh_tool, strings, write_script};

use std::fs;

use simrun::errors::SimrunError;
use simrun::exec::ToolCommand;
use simrun::project::detector::infer_platforms;
use simrun::project::{Detector, ProjectKind};
use simrun::types::Platform;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

const PROJECT_LISTING: &str = r#"echo '{"project": {"name": "App", "schemes": ["App", "App watchOS"], "targets": ["App", "AppTests"]}}'"#;

#[tokio::test]
async fn test_workspace_wins_over_project() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("App.xcodeproj")).unwrap();
    fs::create_dir(dir.path().join("App.xcworkspace")).unwrap();
    let tool = write_script(
        dir.path(),
        "xcodebuild.sh",
        r#"echo '{"workspace": {"name": "App", "schemes": ["App"]}}'"#,
    );

    let info = Detector::new(quiet_executor(), sh_tool(&tool))
        .detect(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(info.kind, ProjectKind::Workspace);
    assert_eq!(info.name, "App");
    assert_eq!(info.schemes, strings(&["App"]));
    assert_eq!(info.platforms, vec![Platform::Ios]);
}

#[tokio::test]
async fn test_project_schemes_and_targets() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("App.xcodeproj")).unwrap();
    let tool = write_script(dir.path(), "xcodebuild.sh", PROJECT_LISTING);

    let info = Detector::new(quiet_executor(), sh_tool(&tool))
        .detect(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(info.kind, ProjectKind::Project);
    assert!(info.path.ends_with("App.xcodeproj"));
    assert_eq!(info.schemes, strings(&["App", "App watchOS"]));
    let targets: Vec<&str> = info.targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(targets, vec!["App", "AppTests"]);
    assert_eq!(info.platforms, vec![Platform::Watchos]);
}

#[tokio::test]
async fn test_failed_introspection_leaves_lists_empty() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("Game.xcodeproj")).unwrap();
    let tool = write_script(dir.path(), "xcodebuild.sh", "echo 'no' 1>&2\nexit 1\n");

    let info = Detector::new(quiet_executor(), sh_tool(&tool))
        .detect(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(info.name, "Game");
    assert!(info.schemes.is_empty());
    assert!(info.targets.is_empty());
}

#[tokio::test]
async fn test_package_manifest_detected_last() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("Package.swift"), "// swift-tools-version:5.9\n").unwrap();
    let tool = write_script(dir.path(), "xcodebuild.sh", "exit 1\n");

    let info = Detector::new(quiet_executor(), sh_tool(&tool))
        .detect(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(info.kind, ProjectKind::Package);
    assert!(info.path.ends_with("Package.swift"));
    assert_eq!(info.platforms, vec![Platform::Macos]);
}

#[tokio::test]
async fn test_empty_directory_is_not_found() {
    let dir = tempdir().unwrap();
    let err = Detector::new(quiet_executor(), ToolCommand::new("false"))
        .detect(dir.path(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SimrunError::NotFound(_)), "got {err:?}");
}

#[test]
fn test_platform_inference_from_schemes() {
    assert_eq!(infer_platforms(&[]), vec![Platform::Ios]);
    assert_eq!(
        infer_platforms(&strings(&["App iOS", "App macOS", "App iOS Tests"])),
        vec![Platform::Ios, Platform::Macos]
    );
    assert_eq!(infer_platforms(&strings(&["Clock Watch App"])), vec![Platform::Watchos]);
}

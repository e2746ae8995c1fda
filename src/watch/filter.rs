// src/watch/filter.rs

use std::path::{Component, Path};

use notify::event::ModifyKind;
use notify::EventKind;

use crate::config::WatchSettings;

/// Project-definition bundles whose contents the build tool rewrites.
const PROJECT_BUNDLE_SUFFIXES: [&str; 2] = [".xcodeproj", ".xcworkspace"];

/// Decides which directories are watched and which changes count.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    extensions: Vec<String>,
    ignore_dirs: Vec<String>,
}

impl WatchFilter {
    /// `extensions` are expected normalized (lowercase, leading dot).
    pub fn new(extensions: Vec<String>, ignore_dirs: Vec<String>) -> Self {
        Self {
            extensions,
            ignore_dirs,
        }
    }

    pub fn from_settings(settings: &WatchSettings) -> Self {
        Self::new(settings.extensions.clone(), settings.ignore_dirs.clone())
    }

    /// Hidden directories, ignored names and project bundles are skipped.
    pub fn should_skip_dir_name(&self, name: &str) -> bool {
        name.starts_with('.')
            || self.ignore_dirs.iter().any(|d| d == name)
            || PROJECT_BUNDLE_SUFFIXES.iter().any(|s| name.ends_with(s))
    }

    /// Whether a changed file under `root` should trigger a rebuild.
    pub fn is_relevant_path(&self, root: &Path, path: &Path) -> bool {
        if !self.has_watched_extension(path) {
            return false;
        }

        let rel = path.strip_prefix(root).unwrap_or(path);
        let mut dirs = rel.components().collect::<Vec<_>>();
        // The last component is the file itself.
        dirs.pop();

        !dirs.iter().any(|c| match c {
            Component::Normal(name) => self.should_skip_dir_name(&name.to_string_lossy()),
            _ => false,
        })
    }

    fn has_watched_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
        self.extensions.iter().any(|e| *e == ext)
    }
}

/// Content writes, creations, renames (atomic saves) and permission changes
/// (some editors' save strategy) count; reads and removals do not.
pub fn is_relevant_kind(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(modify) => matches!(
            modify,
            ModifyKind::Any | ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Metadata(_)
        ),
        _ => false,
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Project folder layout and location
//!
//! A project folder holds one catalog, its settings and the working
//! subfolders (backups, imports, exports, ...). The last folder used is
//! remembered in the per-user config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Catalog file name, also the name uploaded on deploy
pub const CATALOG_FILE: &str = "wreaths.json";
/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

const SUBDIRS: [&str; 5] = ["backups", "imports", "exports", "encoding_backups", "cache/images"];
const LOCATION_FILE: &str = "current_project_folder.json";

/// Paths inside one project folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct RememberedLocation {
    project_folder: PathBuf,
}

impl Project {
    /// Project rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pick the project folder: explicit path, then the remembered one,
    /// then the current directory
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        if let Some(path) = remembered() {
            debug!("Using remembered project folder {}", path.display());
            return Ok(Self::new(path));
        }
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        Ok(Self::new(cwd))
    }

    /// Root folder
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `wreaths.json`
    #[must_use]
    pub fn catalog_file(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    /// `settings.json`
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Timestamped catalog copies
    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Drop folder scanned by `import` when no files are named
    #[must_use]
    pub fn imports_dir(&self) -> PathBuf {
        self.root.join("imports")
    }

    /// Default export location
    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Copies of import files that could not be read
    #[must_use]
    pub fn quarantine_dir(&self) -> PathBuf {
        self.root.join("encoding_backups")
    }

    /// Downloaded images
    #[must_use]
    pub fn image_cache_dir(&self) -> PathBuf {
        self.root.join("cache").join("images")
    }

    /// Create the project folder and its subfolders
    pub fn ensure_structure(&self) -> Result<()> {
        for sub in SUBDIRS {
            let dir = self.root.join(sub);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Remember this folder for later runs
    pub fn remember(&self) -> Result<PathBuf> {
        let config_dir = config_dir().context("Cannot determine config directory")?;
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create directory {}", config_dir.display()))?;

        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let location = RememberedLocation { project_folder: root };
        let path = config_dir.join(LOCATION_FILE);
        let json = serde_json::to_string_pretty(&location).context("Failed to serialize location")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Per-user configuration directory
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "twinfolks", "wreathkeeper")
        .map(|d| d.config_dir().to_path_buf())
}

/// Remembered project folder, if it still exists
#[must_use]
pub fn remembered() -> Option<PathBuf> {
    let path = config_dir()?.join(LOCATION_FILE);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<RememberedLocation>(&content) {
        Ok(loc) if loc.project_folder.is_dir() => Some(loc.project_folder),
        Ok(loc) => {
            warn!("Remembered project folder {} no longer exists", loc.project_folder.display());
            None
        }
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let project = Project::new("/srv/shop");
        assert_eq!(project.catalog_file(), PathBuf::from("/srv/shop/wreaths.json"));
        assert_eq!(project.backups_dir(), PathBuf::from("/srv/shop/backups"));
        assert_eq!(project.image_cache_dir(), PathBuf::from("/srv/shop/cache/images"));
    }

    #[test]
    fn test_ensure_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::new(dir.path().join("shop"));

        project.ensure_structure().unwrap();

        assert!(project.backups_dir().is_dir());
        assert!(project.imports_dir().is_dir());
        assert!(project.quarantine_dir().is_dir());
        assert!(project.image_cache_dir().is_dir());
    }

    #[test]
    fn test_explicit_path_wins() {
        let project = Project::resolve(Some(PathBuf::from("/tmp/elsewhere"))).unwrap();
        assert_eq!(project.root(), Path::new("/tmp/elsewhere"));
    }
}

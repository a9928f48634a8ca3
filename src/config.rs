// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Settings live in the project's `settings.json`. At runtime the file is
//! layered with `WREATHKEEPER_*` environment variables (for example
//! `WREATHKEEPER_NETLIFY_ACCESS_TOKEN`), which take precedence.

use crate::catalog::BackupPolicy;
use crate::encoding;
use crate::project::Project;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default Netlify API root
pub const NETLIFY_API: &str = "https://api.netlify.com/api/v1";

const ENV_PREFIX: &str = "WREATHKEEPER";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Netlify site id (or site name)
    pub netlify_site_id: String,
    /// Netlify personal access token
    pub netlify_access_token: String,
    /// Copy the catalog into `backups/` before every save
    pub auto_backup: bool,
    /// Number of backups to keep
    pub backup_count: u32,
    /// Seconds between deploy status checks
    pub deploy_poll_interval_secs: u64,
    /// Seconds to wait for a deploy before giving up on it
    pub deploy_max_wait_secs: u64,
    /// Deploy API root
    pub netlify_api_url: String,
    /// Keys written by other tools, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            netlify_site_id: String::new(),
            netlify_access_token: String::new(),
            auto_backup: true,
            backup_count: 10,
            deploy_poll_interval_secs: 5,
            deploy_max_wait_secs: 300,
            netlify_api_url: NETLIFY_API.to_string(),
            extra: Map::new(),
        }
    }
}

/// Settings failures
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Layering file and environment failed
    #[error("invalid settings: {0}")]
    Layer(#[from] config::ConfigError),
    /// Key is not a known setting
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    /// Value has the wrong type or range
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Setting name
        key: String,
        /// What was wrong
        reason: String,
    },
    /// Writing settings.json failed
    #[error("could not save settings to {}: {source}", path.display())]
    Write {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Settings could not be encoded
    #[error("could not encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

const KNOWN_KEYS: [&str; 7] = [
    "netlify_site_id",
    "netlify_access_token",
    "auto_backup",
    "backup_count",
    "deploy_poll_interval_secs",
    "deploy_max_wait_secs",
    "netlify_api_url",
];

impl Settings {
    /// Backup behaviour for the catalog store
    #[must_use]
    pub fn backup_policy(&self) -> BackupPolicy {
        BackupPolicy {
            auto_backup: self.auto_backup,
            keep: self.backup_count.max(1) as usize,
        }
    }

    /// Interval between deploy status checks
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.deploy_poll_interval_secs)
    }

    /// Overall deploy wait budget
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.deploy_max_wait_secs)
    }

    /// Whether both deploy credentials are present
    #[must_use]
    pub fn has_deploy_credentials(&self) -> bool {
        !self.netlify_site_id.trim().is_empty() && !self.netlify_access_token.trim().is_empty()
    }

    /// Value of one setting
    pub fn get(&self, key: &str) -> Result<Value, SettingsError> {
        if !KNOWN_KEYS.contains(&key) {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }
        let all = serde_json::to_value(self)?;
        Ok(all.get(key).cloned().unwrap_or(Value::Null))
    }

    /// Assign one setting from its command-line text
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), SettingsError> {
        let current = self.get(key)?;
        let value = match current {
            Value::String(_) => Value::String(raw.trim().to_string()),
            _ => serde_json::from_str(raw.trim()).map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?,
        };

        let mut all = serde_json::to_value(&*self)?;
        if let Value::Object(map) = &mut all {
            map.insert(key.to_string(), value);
        }
        let updated: Settings = serde_json::from_value(all).map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        if updated.backup_count < 1 {
            return Err(SettingsError::InvalidValue {
                key: key.to_string(),
                reason: "backup_count must be at least 1".into(),
            });
        }
        *self = updated;
        Ok(())
    }

    /// Known settings with the access token masked, for display
    #[must_use]
    pub fn masked(&self) -> Vec<(&'static str, Value)> {
        KNOWN_KEYS
            .iter()
            .map(|&key| {
                let value = if key == "netlify_access_token" {
                    Value::String(mask(&self.netlify_access_token))
                } else {
                    self.get(key).unwrap_or(Value::Null)
                };
                (key, value)
            })
            .collect()
    }
}

fn mask(secret: &str) -> String {
    let n = secret.chars().count();
    if n == 0 {
        return String::new();
    }
    let tail: String = secret.chars().skip(n.saturating_sub(4)).collect();
    if n <= 4 {
        "*".repeat(n)
    } else {
        format!("{}{}", "*".repeat(8), tail)
    }
}

/// Load settings from the project file only. Returns defaults plus a
/// warning when the file exists but cannot be used.
#[must_use]
pub fn load_file(project: &Project) -> (Settings, Option<String>) {
    match read_file_json(project) {
        Ok(Some(json)) => match serde_json::from_value(json) {
            Ok(settings) => (settings, None),
            Err(e) => (Settings::default(), Some(format!("settings.json ignored: {e}"))),
        },
        Ok(None) => (Settings::default(), None),
        Err(msg) => (Settings::default(), Some(msg)),
    }
}

/// Load settings from the project file layered with the process environment
#[must_use]
pub fn load(project: &Project) -> (Settings, Option<String>) {
    load_with_env(project, None)
}

/// Like [`load`], with an explicit environment map (`None` reads the process)
#[must_use]
pub fn load_with_env(
    project: &Project,
    env: Option<config::Map<String, String>>,
) -> (Settings, Option<String>) {
    let (file_json, mut warning) = match read_file_json(project) {
        Ok(json) => (json.unwrap_or_else(|| Value::Object(Map::new())), None),
        Err(msg) => (Value::Object(Map::new()), Some(msg)),
    };

    match layered(&file_json, env) {
        Ok(settings) => (settings, warning),
        Err(e) => {
            warn!("Falling back to default settings: {}", e);
            warning.get_or_insert_with(|| e.to_string());
            (Settings::default(), warning)
        }
    }
}

fn layered(file_json: &Value, env: Option<config::Map<String, String>>) -> Result<Settings, SettingsError> {
    let defaults = serde_json::to_string(&Settings::default())?;
    let file = serde_json::to_string(file_json)?;

    let environment = config::Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .source(env);

    let settings = config::Config::builder()
        .add_source(config::File::from_str(&defaults, config::FileFormat::Json))
        .add_source(config::File::from_str(&file, config::FileFormat::Json))
        .add_source(environment)
        .build()?
        .try_deserialize::<Settings>()?;
    Ok(settings)
}

fn read_file_json(project: &Project) -> Result<Option<Value>, String> {
    let path = project.settings_file();
    if !path.exists() {
        debug!("No settings file at {}", path.display());
        return Ok(None);
    }
    match encoding::read_json(&path) {
        Ok(doc) if doc.value.is_object() => Ok(Some(doc.value)),
        Ok(_) => Err("settings.json is not a JSON object; using defaults".into()),
        Err(e) => Err(format!("could not read settings.json: {e}")),
    }
}

/// Write settings to the project's `settings.json`
pub fn save(project: &Project, settings: &Settings) -> Result<(), SettingsError> {
    let path = project.settings_file();
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json).map_err(|source| SettingsError::Write { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_with(settings_json: Option<&str>) -> (TempDir, Project) {
        let dir = TempDir::new().unwrap();
        let project = Project::new(dir.path());
        if let Some(json) = settings_json {
            fs::write(project.settings_file(), json).unwrap();
        }
        (dir, project)
    }

    fn no_env() -> Option<config::Map<String, String>> {
        Some(config::Map::new())
    }

    #[test]
    fn test_defaults_without_file() {
        let (_dir, project) = project_with(None);
        let (settings, warning) = load_with_env(&project, no_env());
        assert!(warning.is_none());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.backup_policy().keep, 10);
    }

    #[test]
    fn test_file_values_and_extra_keys() {
        let (_dir, project) = project_with(Some(
            r#"{"netlify_site_id": "abc", "backup_count": 3, "column_widths": {"0": 80}}"#,
        ));
        let (settings, _) = load_file(&project);
        assert_eq!(settings.netlify_site_id, "abc");
        assert_eq!(settings.backup_count, 3);
        assert!(settings.auto_backup);
        assert!(settings.extra.contains_key("column_widths"));
    }

    #[test]
    fn test_env_overrides_file() {
        let (_dir, project) = project_with(Some(r#"{"netlify_access_token": "from-file", "auto_backup": true}"#));
        let mut env = config::Map::new();
        env.insert("WREATHKEEPER_NETLIFY_ACCESS_TOKEN".to_string(), "from-env".to_string());
        env.insert("WREATHKEEPER_AUTO_BACKUP".to_string(), "false".to_string());

        let (settings, warning) = load_with_env(&project, Some(env));

        assert!(warning.is_none());
        assert_eq!(settings.netlify_access_token, "from-env");
        assert!(!settings.auto_backup);
    }

    #[test]
    fn test_unreadable_file_warns() {
        let (_dir, project) = project_with(Some("{not json"));
        let (settings, warning) = load_with_env(&project, no_env());
        assert!(warning.is_some());
        assert_eq!(settings.backup_count, 10);
    }

    #[test]
    fn test_set_checks_types() {
        let mut settings = Settings::default();
        settings.set("backup_count", "4").unwrap();
        settings.set("netlify_site_id", "12345").unwrap();
        assert_eq!(settings.backup_count, 4);
        assert_eq!(settings.netlify_site_id, "12345");

        assert!(settings.set("backup_count", "lots").is_err());
        assert!(settings.set("backup_count", "0").is_err());
        assert!(matches!(settings.set("colour", "red"), Err(SettingsError::UnknownKey(_))));
        assert_eq!(settings.backup_count, 4);
    }

    #[test]
    fn test_save_round_trip() {
        let (_dir, project) = project_with(None);
        let mut settings = Settings::default();
        settings.netlify_site_id = "my-site".into();
        save(&project, &settings).unwrap();

        let (loaded, warning) = load_file(&project);
        assert!(warning.is_none());
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_token_masked() {
        let mut settings = Settings::default();
        settings.netlify_access_token = "nfp_secret_token_1234".into();
        let shown = settings.masked();
        let token = &shown.iter().find(|(k, _)| *k == "netlify_access_token").unwrap().1;
        assert_eq!(token, "********1234");
    }
}

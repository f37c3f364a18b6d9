//! docsync configuration.
//!
//! Loaded from `<home>/.docsync/config.yaml`. Every section and field is
//! optional; a missing file yields [`Config::default`].
//!
//! ```yaml
//! drift:
//!   staleness_threshold_days: 30
//! staleness:
//!   fresh_days: 7
//!   aging_days: 30
//!   stale_days: 90
//! sync:
//!   max_concurrent: 4
//!   generation_timeout_secs: 120
//! generator:
//!   command: ["docgen", "--format", "markdown"]
//!   model: docgen-v2
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub drift: DriftConfig,
    pub staleness: StalenessThresholds,
    pub sync: SyncConfig,
    pub generator: GeneratorConfig,
}

/// Drift detection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Days since `last_synced_at` after which an otherwise in-sync document is STALE.
    pub staleness_threshold_days: i64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_days: 30,
        }
    }
}

/// Upper bounds (inclusive, in days) of the FRESH, AGING and STALE levels.
/// Anything older than `stale_days` is VERY_STALE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessThresholds {
    pub fresh_days: i64,
    pub aging_days: i64,
    pub stale_days: i64,
}

impl Default for StalenessThresholds {
    fn default() -> Self {
        Self {
            fresh_days: 7,
            aging_days: 30,
            stale_days: 90,
        }
    }
}

/// Sync manager execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on documents processed at once by a project sync.
    pub max_concurrent: usize,
    pub generation_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            generation_timeout_secs: 120,
        }
    }
}

/// External content generator. Absent `command` means no generator is
/// configured and REGENERATE requests fail with "requires manual update".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneratorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// `<home>/.docsync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".docsync").join("config.yaml")
}

/// Load the configuration rooted at `home`.
///
/// Returns defaults if the file does not yet exist.
pub fn load_at(home: &Path) -> Result<Config, StoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, StoreError> {
    load_at(&dirs::home_dir().ok_or(StoreError::HomeNotFound)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(home: &Path, yaml: &str) {
        let path = config_path_at(home);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, yaml).unwrap();
    }

    #[test]
    fn defaults_when_file_missing() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).expect("load");
        assert_eq!(config, Config::default());
        assert_eq!(config.drift.staleness_threshold_days, 30);
        assert_eq!(config.staleness.fresh_days, 7);
        assert!(config.generator.command.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "staleness:\n  fresh_days: 3\nsync:\n  max_concurrent: 8\n");
        let config = load_at(home.path()).expect("load");
        assert_eq!(config.staleness.fresh_days, 3);
        assert_eq!(config.staleness.aging_days, 30);
        assert_eq!(config.sync.max_concurrent, 8);
        assert_eq!(config.sync.generation_timeout_secs, 120);
    }

    #[test]
    fn generator_command_parses_as_argv() {
        let home = TempDir::new().unwrap();
        write_config(
            home.path(),
            "generator:\n  command: [\"docgen\", \"--fast\"]\n  model: docgen-v2\n",
        );
        let config = load_at(home.path()).expect("load");
        assert_eq!(
            config.generator.command,
            Some(vec!["docgen".to_string(), "--fast".to_string()])
        );
        assert_eq!(config.generator.model.as_deref(), Some("docgen-v2"));
    }

    #[test]
    fn malformed_file_reports_path() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "sync: [not, a, mapping");
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }
}

//! CLI configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Snapshot file used when `--snapshot` is not given.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Namespace used when `--namespace` is not given.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Logging level, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_snapshot_path() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("snapshot.json"))
        .unwrap_or_else(|| PathBuf::from("toolcred-snapshot.json"))
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            default_namespace: default_namespace(),
            log_level: default_log_level(),
            config_path: PathBuf::new(),
        }
    }
}

/// Load configuration from the default location or create defaults.
pub fn load_config() -> Result<CliConfig> {
    let config_path = project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("toolcred.toml"));

    load_config_from(&config_path)
}

/// Load configuration from `path`, falling back to defaults if it is missing.
pub fn load_config_from(path: &Path) -> Result<CliConfig> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?
    } else {
        CliConfig::default()
    };

    config.config_path = path.to_path_buf();
    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "raibid-labs", "toolcred")
}

//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RteError};

/// Default reserved suffix appended to a disabled item's name.
///
/// Deliberately unusual so a collision with a real sibling entry is
/// practically impossible; configurable for installations that need a
/// different marker.
pub const DEFAULT_DISABLE_SUFFIX: &str = ".rte-disabled";

/// Full engine configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub paths: PathsConfig,
    pub engine: EngineConfig,
    pub backup: BackupConfig,
}

/// Filesystem paths used by rte.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub manifest_file: PathBuf,
    pub operations_log: PathBuf,
}

/// Removal-trial behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Suffix appended to an item's name when it is disabled.
    pub disable_suffix: String,
    /// Bounded capacity of the operation-logger channel.
    pub log_channel_capacity: usize,
}

/// Backup step defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupConfig {
    /// Default backup root offered by the CLI when none is given.
    pub default_root: Option<PathBuf>,
    /// Extra free-space margin (percent of required bytes) demanded by the
    /// pre-flight space check.
    pub headroom_pct: f64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[RTE-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("rte").join("config.toml");
        let data = home_dir.join(".local").join("share").join("rte");
        Self {
            config_file: cfg,
            manifest_file: data.join("active-trial.json"),
            operations_log: data.join("operations.jsonl"),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            disable_suffix: DEFAULT_DISABLE_SUFFIX.to_string(),
            log_channel_capacity: 1024,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            default_root: None,
            headroom_pct: 5.0,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| RteError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(RteError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(raw) = env::var_os("RTE_MANIFEST_FILE") {
            self.paths.manifest_file = PathBuf::from(raw);
        }
        if let Some(raw) = env::var_os("RTE_OPERATIONS_LOG") {
            self.paths.operations_log = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("RTE_DISABLE_SUFFIX")
            && !raw.is_empty()
        {
            self.engine.disable_suffix = raw;
        }
        if let Some(raw) = env::var_os("RTE_BACKUP_ROOT") {
            self.backup.default_root = Some(PathBuf::from(raw));
        }
    }

    fn validate(&self) -> Result<()> {
        let suffix = &self.engine.disable_suffix;
        if suffix.is_empty() {
            return Err(RteError::InvalidConfig {
                details: "engine.disable_suffix must not be empty".to_string(),
            });
        }
        if suffix.contains(['/', '\\']) {
            return Err(RteError::InvalidConfig {
                details: format!(
                    "engine.disable_suffix must not contain path separators, got {suffix:?}"
                ),
            });
        }
        if self.engine.log_channel_capacity == 0 {
            return Err(RteError::InvalidConfig {
                details: "engine.log_channel_capacity must be >= 1".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&self.backup.headroom_pct) {
            return Err(RteError::InvalidConfig {
                details: format!(
                    "backup.headroom_pct must be in [0, 100], got {}",
                    self.backup.headroom_pct
                ),
            });
        }
        Ok(())
    }
}

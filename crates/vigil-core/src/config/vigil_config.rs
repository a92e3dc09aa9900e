//! Top-level Vigil configuration with layered resolution.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{EngineConfig, RunMode, ScanConfig};
use crate::errors::ConfigError;

/// Project config file name, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "vigil.toml";

/// Engine and enumeration settings for one analysis run.
///
/// Layers, lowest first: compiled defaults, `~/.vigil/config.toml`,
/// `vigil.toml` in the project root, `VIGIL_*` environment variables, and
/// finally `CliOverrides`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VigilConfig {
    pub engine: EngineConfig,
    pub scan: ScanConfig,
}

/// Values a command line may force regardless of files and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub queue_capacity: Option<usize>,
    pub workers: Option<usize>,
    pub run_mode: Option<RunMode>,
    pub global_tools_only: Option<bool>,
    pub max_file_size: Option<u64>,
}

impl VigilConfig {
    /// Resolve every layer for the project at `root` and validate the result.
    ///
    /// A malformed user config is an error; an unreadable one is skipped.
    pub fn load(root: &Path, cli: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = user_config_path().filter(|p| p.exists()) {
            match read_layer(&path) {
                Ok(layer) => config.overlay(&layer),
                Err(err @ ConfigError::ParseError { .. }) => return Err(err),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable user config");
                }
            }
        }

        let project = root.join(PROJECT_CONFIG_FILE);
        if project.exists() {
            config.overlay(&read_layer(&project)?);
        }

        config.overlay(&env_layer());
        if let Some(cli) = cli {
            config.overlay(&cli.as_layer());
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse and validate a config held in memory.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config = parse_layer(toml_str, "<string>")?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(config: &VigilConfig) -> Result<(), ConfigError> {
        let zeroed = [
            ("engine.queue_capacity", config.engine.queue_capacity == Some(0)),
            ("engine.shutdown_timeout_ms", config.engine.shutdown_timeout_ms == Some(0)),
            ("scan.max_file_size", config.scan.max_file_size == Some(0)),
        ];
        match zeroed.into_iter().find(|(_, zero)| *zero) {
            Some((field, _)) => Err(ConfigError::ValidationFailed {
                field: field.to_string(),
                message: "must be greater than 0".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn overlay(&mut self, upper: &VigilConfig) {
        self.engine.overlay(&upper.engine);
        self.scan.overlay(&upper.scan);
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

impl CliOverrides {
    fn as_layer(&self) -> VigilConfig {
        let mut layer = VigilConfig::default();
        layer.engine.queue_capacity = self.queue_capacity;
        layer.engine.workers = self.workers;
        layer.engine.run_mode = self.run_mode;
        layer.engine.global_tools_only = self.global_tools_only;
        layer.scan.max_file_size = self.max_file_size;
        layer
    }
}

fn parse_layer(content: &str, origin: &str) -> Result<VigilConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_string(),
        message: e.to_string(),
    })
}

/// Unknown keys are ignored.
fn read_layer(path: &Path) -> Result<VigilConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.display().to_string(),
    })?;
    parse_layer(&content, &path.display().to_string())
}

/// `VIGIL_<SECTION>_<FIELD>` variables. Unparseable values are skipped.
fn env_layer() -> VigilConfig {
    let mut layer = VigilConfig::default();
    layer.engine.queue_capacity = env_value("VIGIL_ENGINE_QUEUE_CAPACITY");
    layer.engine.workers = env_value("VIGIL_ENGINE_WORKERS");
    layer.engine.run_mode = env_value("VIGIL_ENGINE_RUN_MODE");
    layer.scan.max_file_size = env_value("VIGIL_SCAN_MAX_FILE_SIZE");
    layer
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// `~/.vigil/config.toml`, if a home directory is known.
fn user_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".vigil").join("config.toml"))
}

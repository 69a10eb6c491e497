//! Trap relay configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for `trap-relay.toml`
//! - Config resolution (CLI → env → XDG → /etc → defaults)
//! - Deployment overrides from environment variables
//! - Semantic validation

pub mod resolve;
pub mod settings;
pub mod validate;

pub use resolve::{resolve_config_path, ConfigSource, CONFIG_FILENAME};
pub use settings::{
    Config, LoggingConfig, ProcessorConfig, RelayConfig, SinkConfig, StoreConfig,
};
pub use validate::{validate_config, ValidationError, ValidationResult};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment overrides applied after the file is read.
pub const ENV_SINK_PATH: &str = "TRAP_RELAY_SINK_PATH";
pub const ENV_STORE_PATH: &str = "TRAP_RELAY_STORE_PATH";
pub const ENV_FALLBACK_PATH: &str = "TRAP_RELAY_FALLBACK_PATH";
pub const ENV_POLL_INTERVAL_SECS: &str = "TRAP_RELAY_POLL_INTERVAL_SECS";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid TOML in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value in {var}: {value:?}")]
    InvalidOverride { var: String, value: String },

    #[error("Semantic validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the config was read from (None if using defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Resolve, read, override from the environment, and validate.
pub fn load_config(cli_path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let (path, source) = resolve_config_path(cli_path);
    let mut config = match &path {
        Some(p) => load_from_path(p)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config)?;

    Ok(LoadedConfig {
        config,
        path,
        source,
    })
}

/// Read and parse one config file without overrides or validation.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Apply deployment overrides using `lookup` to read variables.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_SINK_PATH) {
        config.sink.path = PathBuf::from(v);
    }
    if let Some(v) = lookup(ENV_STORE_PATH) {
        config.store.path = PathBuf::from(v);
    }
    if let Some(v) = lookup(ENV_FALLBACK_PATH) {
        config.relay.fallback_path = PathBuf::from(v);
    }
    if let Some(v) = lookup(ENV_POLL_INTERVAL_SECS) {
        config.processor.poll_interval_secs =
            v.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    var: ENV_POLL_INTERVAL_SECS.to_string(),
                    value: v.clone(),
                })?;
    }
    Ok(())
}

//! Logging configuration.
//!
//! Supports configuration via:
//! - Environment variables (TRAP_RELAY_LOG, RUST_LOG, TRAP_RELAY_LOG_FORMAT)
//! - The `[logging]` config section
//! - CLI flags (-v, -q, --log-format)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console format (default).
    #[default]
    Human,
    /// Machine-parseable JSON lines.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" | "structured" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Human => write!(f, "human"),
            LogFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" | "quiet" => Ok(LogLevel::Off),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
            LogLevel::Off => tracing_subscriber::filter::LevelFilter::OFF,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Output format.
    pub format: LogFormat,
    /// Minimum log level.
    pub level: LogLevel,
    /// Whether to include timestamps in human output.
    pub timestamps: bool,
    /// Append JSONL here instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            timestamps: true,
            file: None,
        }
    }
}

impl LogConfig {
    /// Build from the config-file section, then env vars, then CLI overrides.
    pub fn resolve(
        section: &tr_config::LoggingConfig,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        Self::resolve_with(section, cli_level, cli_format, |k| std::env::var(k).ok())
    }

    pub(crate) fn resolve_with<F>(
        section: &tr_config::LoggingConfig,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LogConfig::default();

        if let Some(level) = section.level.as_deref().and_then(|s| s.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = section.format.as_deref().and_then(|s| s.parse().ok()) {
            config.format = format;
        }
        config.file.clone_from(&section.file);

        // TRAP_RELAY_LOG takes precedence over RUST_LOG
        if let Some(level) = lookup("TRAP_RELAY_LOG").and_then(|v| v.parse().ok()) {
            config.level = level;
        } else if let Some(val) = lookup("RUST_LOG") {
            if val.contains("trace") {
                config.level = LogLevel::Trace;
            } else if val.contains("debug") {
                config.level = LogLevel::Debug;
            } else if val.contains("warn") {
                config.level = LogLevel::Warn;
            } else if val.contains("error") {
                config.level = LogLevel::Error;
            }
        }

        if let Some(format) = lookup("TRAP_RELAY_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            config.format = format;
        }

        // CLI overrides take final precedence
        if let Some(level) = cli_level {
            config.level = level;
        }
        if let Some(format) = cli_format {
            config.format = format;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("human".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert_eq!("jsonl".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("quiet".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_precedence_section_env_cli() {
        let section = tr_config::LoggingConfig {
            level: Some("warn".into()),
            format: Some("jsonl".into()),
            file: None,
        };

        let from_section = LogConfig::resolve_with(&section, None, None, |_| None);
        assert_eq!(from_section.level, LogLevel::Warn);
        assert_eq!(from_section.format, LogFormat::Jsonl);

        let from_env = LogConfig::resolve_with(&section, None, None, |k| {
            (k == "TRAP_RELAY_LOG").then(|| "debug".to_string())
        });
        assert_eq!(from_env.level, LogLevel::Debug);

        let from_cli = LogConfig::resolve_with(
            &section,
            Some(LogLevel::Error),
            Some(LogFormat::Human),
            |_| Some("trace".to_string()),
        );
        assert_eq!(from_cli.level, LogLevel::Error);
        assert_eq!(from_cli.format, LogFormat::Human);
    }

    #[test]
    fn test_rust_log_fallback() {
        let config =
            LogConfig::resolve_with(&Default::default(), None, None, |k| {
                (k == "RUST_LOG").then(|| "tr_core=trace".to_string())
            });
        assert_eq!(config.level, LogLevel::Trace);
    }
}

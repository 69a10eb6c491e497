//! Typed configuration sections.
//!
//! # Example
//!
//! ```toml
//! [sink]
//! path = "/var/lib/trap-relay/sink.db"
//! timeout_ms = 2000
//!
//! [relay]
//! max_index_len = 10000
//! ttl_secs = 604800
//! fallback_path = "/var/log/snmp/trap_fallback.log"
//!
//! [store]
//! path = "/var/lib/trap-relay/traps.db"
//! connect_attempts = 5
//!
//! [processor]
//! poll_interval_secs = 10
//!
//! [logging]
//! level = "info"
//! format = "jsonl"
//! file = "/var/log/trap-relay/processor.log"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub sink: SinkConfig,
    pub relay: RelayConfig,
    pub store: StoreConfig,
    pub processor: ProcessorConfig,
    pub logging: LoggingConfig,
}

/// Delivery sink connection and key layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    /// Sink database file.
    pub path: PathBuf,
    /// Connection/lock timeout in milliseconds.
    pub timeout_ms: u64,
    /// Arrival-ordered index, newest first.
    pub index_key: String,
    /// Prefix for per-event record keys.
    pub record_prefix: String,
    /// Running delivery statistics record.
    pub stats_key: String,
    /// Consumption cursor token.
    pub cursor_key: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/trap-relay/sink.db"),
            timeout_ms: 2000,
            index_key: "snmp:traps".to_string(),
            record_prefix: "snmp:trap:".to_string(),
            stats_key: "snmp:stats".to_string(),
            cursor_key: "snmp:processor:last_processed".to_string(),
        }
    }
}

impl SinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Ingest-side relay behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Index entries kept; older entries are discarded.
    pub max_index_len: usize,
    /// Record time-to-live in seconds.
    pub ttl_secs: u64,
    /// Local append-only file used when the sink is unreachable.
    pub fallback_path: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_index_len: 10_000,
            ttl_secs: 7 * 24 * 60 * 60,
            fallback_path: PathBuf::from("/var/log/snmp/trap_fallback.log"),
        }
    }
}

/// Relational store connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Store database file.
    pub path: PathBuf,
    /// Statement/lock timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connection attempts at startup before giving up.
    pub connect_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub connect_base_delay_ms: u64,
    /// Upper bound on a single retry delay.
    pub connect_max_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/trap-relay/traps.db"),
            timeout_ms: 5000,
            connect_attempts: 5,
            connect_base_delay_ms: 500,
            connect_max_delay_ms: 10_000,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Consumption loop behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorConfig {
    /// Sleep between cycles.
    pub poll_interval_secs: u64,
    /// Events that could not be stored are appended here.
    pub failure_log_path: PathBuf,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            failure_log_path: PathBuf::from("/var/log/snmp/trap_store_failures.log"),
        }
    }
}

impl ProcessorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Logging overrides; CLI flags and env vars still take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    /// Write JSONL logs here instead of stderr.
    pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.sink.index_key, "snmp:traps");
        assert_eq!(config.sink.cursor_key, "snmp:processor:last_processed");
        assert_eq!(config.relay.max_index_len, 10_000);
        assert_eq!(config.relay.ttl_secs, 604_800);
        assert_eq!(config.store.connect_attempts, 5);
        assert_eq!(config.processor.poll_interval(), Duration::from_secs(10));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [relay]
            max_index_len = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.relay.max_index_len, 50);
        assert_eq!(config.relay.ttl_secs, 604_800);
        assert_eq!(config.sink, SinkConfig::default());
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<Config, _> = toml::from_str("[relay]\nmax_len = 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}

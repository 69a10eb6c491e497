//! Configuration validation errors and semantic validation.

use crate::settings::Config;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Key collision: {first} and {second} both use {key:?}")]
    KeyCollision {
        first: String,
        second: String,
        key: String,
    },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::KeyCollision { .. } => 67,
        }
    }
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Validate a loaded configuration semantically.
pub fn validate_config(config: &Config) -> ValidationResult<()> {
    if config.sink.timeout_ms == 0 {
        return Err(invalid("sink.timeout_ms", "must be positive"));
    }
    if config.relay.max_index_len == 0 {
        return Err(invalid("relay.max_index_len", "must be positive"));
    }
    if config.relay.ttl_secs == 0 {
        return Err(invalid("relay.ttl_secs", "must be positive"));
    }
    if config.store.timeout_ms == 0 {
        return Err(invalid("store.timeout_ms", "must be positive"));
    }
    if config.store.connect_attempts == 0 {
        return Err(invalid("store.connect_attempts", "must be at least 1"));
    }
    if config.store.connect_base_delay_ms > config.store.connect_max_delay_ms {
        return Err(invalid(
            "store.connect_base_delay_ms",
            "must not exceed store.connect_max_delay_ms",
        ));
    }
    if config.processor.poll_interval_secs == 0 {
        return Err(invalid("processor.poll_interval_secs", "must be positive"));
    }

    let keys = [
        ("sink.index_key", &config.sink.index_key),
        ("sink.record_prefix", &config.sink.record_prefix),
        ("sink.stats_key", &config.sink.stats_key),
        ("sink.cursor_key", &config.sink.cursor_key),
    ];
    for (field, key) in &keys {
        if key.trim().is_empty() {
            return Err(invalid(field, "must not be empty"));
        }
    }
    for (i, (first, a)) in keys.iter().enumerate() {
        for (second, b) in &keys[i + 1..] {
            if a == b {
                return Err(ValidationError::KeyCollision {
                    first: first.to_string(),
                    second: second.to_string(),
                    key: a.to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&Config::default()), Ok(()));
    }

    #[test]
    fn zero_retention_rejected() {
        let mut config = Config::default();
        config.relay.max_index_len = 0;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.code(), 65);
        assert!(err.to_string().contains("relay.max_index_len"));
    }

    #[test]
    fn backoff_bounds_checked() {
        let mut config = Config::default();
        config.store.connect_base_delay_ms = 20_000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn colliding_keys_rejected() {
        let mut config = Config::default();
        config.sink.cursor_key = config.sink.stats_key.clone();
        match validate_config(&config) {
            Err(ValidationError::KeyCollision { first, second, .. }) => {
                assert_eq!(first, "sink.stats_key");
                assert_eq!(second, "sink.cursor_key");
            }
            other => panic!("expected key collision, got {:?}", other),
        }
    }
}

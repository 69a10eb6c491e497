//! Structured event definitions for logging.
//!
//! Every pipeline event carries a correlation `run_id`, the relaying
//! `host_id`, and the stage that emitted it.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, configuration, resource acquisition.
    Init,
    /// Notification parsing and normalization.
    Ingest,
    /// Delivery to the sink or the local fallback file.
    Relay,
    /// Cursor-gated retrieval from the sink.
    Consume,
    /// Vendor field extraction.
    Flatten,
    /// Relational store writes and the failure log.
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Ingest => "ingest",
            Stage::Relay => "relay",
            Stage::Consume => "consume",
            Stage::Flatten => "flatten",
            Stage::Persist => "persist",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const LOG_FILE_UNAVAILABLE: &str = "log.file_unavailable";
    pub const SIGNALS_UNAVAILABLE: &str = "shutdown.signals_unavailable";

    // Ingest
    pub const TRAP_RECEIVED: &str = "trap.received";
    pub const TRAP_REJECTED: &str = "trap.rejected";

    // Relay
    pub const RELAY_DELIVERED: &str = "relay.delivered";
    pub const RELAY_FELL_BACK: &str = "relay.fell_back";
    pub const RELAY_LOST: &str = "relay.lost";
    pub const REPLAY_FINISHED: &str = "replay.finished";

    // Consume
    pub const CONSUME_BATCH: &str = "consume.batch";
    pub const CONSUME_IDLE: &str = "consume.idle";
    pub const CONSUME_SINK_UNAVAILABLE: &str = "consume.sink_unavailable";
    pub const CONSUME_DECODE_FAILED: &str = "consume.decode_failed";
    pub const CONSUME_MISSING: &str = "consume.missing";
    pub const CURSOR_ADVANCED: &str = "cursor.advanced";
    pub const CURSOR_STALLED: &str = "cursor.stalled";
    pub const SHUTDOWN_REQUESTED: &str = "shutdown.requested";

    // Flatten
    pub const TRAP_FLATTENED: &str = "trap.flattened";

    // Persist
    pub const PERSIST_STORED: &str = "persist.stored";
    pub const PERSIST_DUPLICATE: &str = "persist.duplicate";
    pub const PERSIST_FELL_BACK: &str = "persist.fell_back";
    pub const PERSIST_LOST: &str = "persist.lost";
    pub const STORE_CONNECTED: &str = "store.connected";
    pub const STORE_CONNECT_RETRY: &str = "store.connect_retry";
    pub const STORE_CONNECT_FAILED: &str = "store.connect_failed";
}

/// Correlation context handed to each component at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    /// Unique ID for this process invocation.
    pub run_id: String,
    /// Identity of the machine running the relay.
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }

    /// Context with fresh IDs for this process.
    pub fn for_process() -> Self {
        LogContext::new(super::generate_run_id(), super::get_host_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Relay).unwrap(), "\"relay\"");
        assert_eq!(Stage::Persist.to_string(), "persist");
    }

    #[test]
    fn test_level_from_tracing() {
        assert_eq!(Level::from(tracing::Level::INFO), Level::Info);
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
        assert_eq!(Level::from(tracing::Level::ERROR), Level::Error);
    }

    #[test]
    fn test_event_names_are_dotted() {
        for name in [
            event_names::RELAY_FELL_BACK,
            event_names::PERSIST_FELL_BACK,
            event_names::CONSUME_SINK_UNAVAILABLE,
            event_names::LOG_FILE_UNAVAILABLE,
            event_names::SIGNALS_UNAVAILABLE,
        ] {
            assert!(name.contains('.'), "{name}");
        }
    }

    #[test]
    fn degradation_events_have_their_own_names() {
        assert_ne!(event_names::SIGNALS_UNAVAILABLE, event_names::RUN_STARTED);
        assert_ne!(event_names::LOG_FILE_UNAVAILABLE, event_names::CONFIG_LOADED);
    }
}

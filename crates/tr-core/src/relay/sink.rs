//! Delivery sink contract.
//!
//! The relay side writes through [`Sink`]; the consumption side reads
//! through [`SinkSource`]. Both describe the same keyed layout:
//!
//! - a per-event record under `record_prefix + event_id`, with a TTL
//! - an arrival-ordered index of event IDs, newest first, bounded length
//! - a statistics hash of running counters
//! - a string slot holding the consumption cursor

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tr_common::{EventId, TrapEvent};

/// Errors talking to the delivery sink.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    #[error("sink write failed: {0}")]
    Write(String),

    #[error("sink read failed: {0}")]
    Read(String),
}

impl From<SinkError> for tr_common::Error {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Unavailable(msg) => tr_common::Error::SinkUnavailable(msg),
            SinkError::Write(msg) | SinkError::Read(msg) => tr_common::Error::SinkWrite(msg),
        }
    }
}

/// Retention bounds applied on every delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Index entries beyond this many are discarded, oldest first.
    pub max_index_len: usize,
    /// Per-event record time-to-live.
    pub ttl: Duration,
}

impl Retention {
    pub fn from_config(config: &tr_config::RelayConfig) -> Self {
        Retention {
            max_index_len: config.max_index_len,
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Retention::from_config(&tr_config::RelayConfig::default())
    }
}

/// One event handed to a sink.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    pub event: &'a TrapEvent,
    /// Serialized envelope stored as the record body.
    pub body: &'a str,
    pub retention: Retention,
}

/// Running delivery counters. Monotonic; never reset by this system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub total: u64,
    pub by_severity: BTreeMap<String, u64>,
    pub by_host: BTreeMap<String, u64>,
    pub last_trap: Option<String>,
}

impl DeliveryStats {
    /// Fold one delivered event into the counters.
    pub fn record(&mut self, event: &TrapEvent) {
        self.total += 1;
        *self
            .by_severity
            .entry(event.severity.as_str().to_string())
            .or_default() += 1;
        *self.by_host.entry(event.host.clone()).or_default() += 1;
        self.last_trap = Some(event.timestamp_string());
    }
}

/// Write side of the sink.
pub trait Sink {
    /// Apply the whole delivery atomically, or not at all.
    fn deliver(&mut self, delivery: &Delivery<'_>) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn deliver(&mut self, delivery: &Delivery<'_>) -> Result<(), SinkError> {
        (**self).deliver(delivery)
    }
}

/// Read side of the sink, plus the cursor slot.
pub trait SinkSource {
    /// Full index, newest first.
    fn index(&mut self) -> Result<Vec<EventId>, SinkError>;

    /// Event body for `id`, or `None` if it expired or never existed.
    fn fetch(&mut self, id: &EventId) -> Result<Option<String>, SinkError>;

    /// Last advanced cursor, if any.
    fn cursor(&mut self) -> Result<Option<EventId>, SinkError>;

    fn advance_cursor(&mut self, id: &EventId) -> Result<(), SinkError>;

    fn stats(&mut self) -> Result<DeliveryStats, SinkError>;
}

impl<S: SinkSource + ?Sized> SinkSource for &mut S {
    fn index(&mut self) -> Result<Vec<EventId>, SinkError> {
        (**self).index()
    }

    fn fetch(&mut self, id: &EventId) -> Result<Option<String>, SinkError> {
        (**self).fetch(id)
    }

    fn cursor(&mut self) -> Result<Option<EventId>, SinkError> {
        (**self).cursor()
    }

    fn advance_cursor(&mut self, id: &EventId) -> Result<(), SinkError> {
        (**self).advance_cursor(id)
    }

    fn stats(&mut self) -> Result<DeliveryStats, SinkError> {
        (**self).stats()
    }
}

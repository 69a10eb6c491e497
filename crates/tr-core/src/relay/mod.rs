//! Delivery relay: sink first, local fallback file second.
//!
//! The relay never propagates a sink failure. The only error it returns is
//! the case where the fallback file could not be written either.

pub mod sink;
pub mod sqlite;

pub use sink::{Delivery, DeliveryStats, Retention, Sink, SinkError, SinkSource};
pub use sqlite::{ReconnectingSource, SinkKeys, SqliteSink};

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tr_common::{EventId, TrapEvent};

use crate::fallback::{FallbackError, FallbackLog};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};

/// Which path an event took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Written to the sink.
    Delivered { id: EventId },
    /// Sink failed; appended to the local fallback file instead.
    FellBack { path: PathBuf, reason: String },
}

/// Both delivery paths failed, or the event could not be serialized.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("event lost: sink failed ({sink}); fallback failed ({fallback})")]
    Lost {
        sink: SinkError,
        #[source]
        fallback: FallbackError,
    },

    #[error("event could not be serialized: {0}")]
    Encode(#[source] tr_common::Error),
}

impl From<RelayError> for tr_common::Error {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Lost { fallback, .. } => fallback.into(),
            RelayError::Encode(inner) => inner,
        }
    }
}

/// Relays events to one sink, degrading to a fallback file.
pub struct Relay<S> {
    /// The sink, or why it could not be opened.
    sink: Result<S, SinkError>,
    fallback: FallbackLog,
    retention: Retention,
    ctx: LogContext,
}

impl<S: Sink> Relay<S> {
    /// `sink` is the result of opening the sink, so an unreachable sink
    /// still yields a working relay.
    pub fn new(
        sink: Result<S, SinkError>,
        fallback: FallbackLog,
        retention: Retention,
        ctx: LogContext,
    ) -> Self {
        Relay {
            sink,
            fallback,
            retention,
            ctx,
        }
    }

    pub fn fallback_path(&self) -> &Path {
        self.fallback.path()
    }

    /// Hand `event` to the sink, or to the fallback file if that fails.
    pub fn relay(&mut self, event: &TrapEvent) -> Result<RelayOutcome, RelayError> {
        let body = event.to_json_line().map_err(RelayError::Encode)?;

        let attempt = match &mut self.sink {
            Ok(sink) => sink.deliver(&Delivery {
                event,
                body: &body,
                retention: self.retention,
            }),
            Err(open_err) => Err(open_err.clone()),
        };

        let sink_err = match attempt {
            Ok(()) => {
                log_event!(
                    self.ctx,
                    INFO,
                    event_names::RELAY_DELIVERED,
                    Stage::Relay,
                    "trap delivered to sink",
                    event_id = event.event_id.as_str(),
                    severity = event.severity.as_str(),
                    trap = event.trap_name.as_str()
                );
                return Ok(RelayOutcome::Delivered {
                    id: event.event_id.clone(),
                });
            }
            Err(err) => err,
        };

        match self.fallback.append(&body) {
            Ok(()) => {
                log_event!(
                    self.ctx,
                    WARN,
                    event_names::RELAY_FELL_BACK,
                    Stage::Relay,
                    "sink unavailable; trap written to fallback file",
                    event_id = event.event_id.as_str(),
                    error = sink_err.to_string().as_str(),
                    path = self.fallback.path().display().to_string().as_str()
                );
                Ok(RelayOutcome::FellBack {
                    path: self.fallback.path().to_path_buf(),
                    reason: sink_err.to_string(),
                })
            }
            Err(fallback_err) => {
                log_event!(
                    self.ctx,
                    ERROR,
                    event_names::RELAY_LOST,
                    Stage::Relay,
                    "sink and fallback file both failed",
                    event_id = event.event_id.as_str(),
                    sink_error = sink_err.to_string().as_str(),
                    fallback_error = fallback_err.to_string().as_str()
                );
                Err(RelayError::Lost {
                    sink: sink_err,
                    fallback: fallback_err,
                })
            }
        }
    }
}

/// Result of re-relaying a fallback file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub delivered: usize,
    /// Lines that did not decode as an event envelope.
    pub skipped: usize,
}

/// Replay stopped because the sink failed part-way.
#[derive(Debug, Error)]
#[error("replay stopped after {} events: {source}", .report.delivered)]
pub struct ReplayError {
    pub report: ReplayReport,
    #[source]
    pub source: SinkError,
}

/// Deliver every decodable fallback line to `sink`, keeping event IDs.
///
/// Does not touch the fallback file; replaying it twice is absorbed by the
/// store's idempotent insert.
pub fn replay<S, I>(
    lines: I,
    sink: &mut S,
    retention: Retention,
    ctx: &LogContext,
) -> Result<ReplayReport, ReplayError>
where
    S: Sink,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut report = ReplayReport::default();
    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        let event = match TrapEvent::decode(line) {
            Ok(event) => event,
            Err(err) => {
                log_event!(
                    ctx,
                    WARN,
                    event_names::CONSUME_DECODE_FAILED,
                    Stage::Relay,
                    "skipping undecodable fallback line",
                    error = err.to_string().as_str()
                );
                report.skipped += 1;
                continue;
            }
        };
        let delivery = Delivery {
            event: &event,
            body: line,
            retention,
        };
        if let Err(source) = sink.deliver(&delivery) {
            return Err(ReplayError { report, source });
        }
        report.delivered += 1;
    }

    log_event!(
        ctx,
        INFO,
        event_names::REPLAY_FINISHED,
        Stage::Relay,
        "fallback replay finished",
        delivered = report.delivered as u64,
        skipped = report.skipped as u64
    );
    Ok(report)
}

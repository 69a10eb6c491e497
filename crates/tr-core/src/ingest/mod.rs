//! Ingest side: raw notification lines to a relayed [`TrapEvent`].
//!
//! One invocation handles exactly one notification, synchronously.

pub mod normalize;
pub mod parser;
pub mod severity;

pub use normalize::{normalize, trap_name};
pub use parser::{extract_source_ip, parse_notification, ParseError, ParsedNotification};
pub use severity::{classify, is_vendor_severity_oid};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tr_common::TrapEvent;

use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::relay::{Relay, RelayError, RelayOutcome, Sink};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("rejected notification: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl From<IngestError> for tr_common::Error {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Parse(e) => e.into(),
            IngestError::Relay(e) => e.into(),
        }
    }
}

/// Parse and normalize one notification received at `at`.
pub fn build_event<S: AsRef<str>>(
    lines: &[S],
    at: DateTime<Utc>,
    ctx: &LogContext,
) -> Result<TrapEvent, ParseError> {
    let parsed = match parse_notification(lines) {
        Ok(parsed) => parsed,
        Err(err) => {
            log_event!(
                ctx,
                ERROR,
                event_names::TRAP_REJECTED,
                Stage::Ingest,
                "notification rejected",
                error = err.to_string().as_str()
            );
            return Err(err);
        }
    };

    let event = normalize(parsed, at);
    log_event!(
        ctx,
        INFO,
        event_names::TRAP_RECEIVED,
        Stage::Ingest,
        "trap received",
        event_id = event.event_id.as_str(),
        host = event.host.as_str(),
        source_ip = event.source_ip.as_str(),
        trap = event.trap_name.as_str(),
        severity = event.severity.as_str(),
        varbinds = event.varbinds.len() as u64
    );
    Ok(event)
}

/// Parse, normalize, and relay one notification.
pub fn ingest<L, S>(
    lines: &[L],
    at: DateTime<Utc>,
    relay: &mut Relay<S>,
    ctx: &LogContext,
) -> Result<RelayOutcome, IngestError>
where
    L: AsRef<str>,
    S: Sink,
{
    let event = build_event(lines, at, ctx)?;
    Ok(relay.relay(&event)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackLog;
    use crate::relay::Retention;
    use crate::testing::MemorySink;

    fn ctx() -> LogContext {
        LogContext::new("run-test", "host-test")
    }

    #[test]
    fn ingest_delivers_normalized_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = MemorySink::new();
        let mut relay = Relay::new(
            Ok(&mut sink),
            FallbackLog::new(dir.path().join("fallback.log")),
            Retention::default(),
            ctx(),
        );

        let outcome = ingest(
            &[
                "host-a",
                "UDP: [10.0.0.5]:161->",
                "SNMPv2-MIB::snmpTrapOID.0 SNMPv2-MIB::linkDown",
            ],
            Utc::now(),
            &mut relay,
            &ctx(),
        )
        .unwrap();
        drop(relay);

        let RelayOutcome::Delivered { id } = outcome else {
            panic!("expected delivery, got {outcome:?}");
        };
        let event = TrapEvent::decode(&sink.records[&id]).unwrap();
        assert_eq!(event.trap_name, "linkDown");
        assert_eq!(event.event_id, id);
    }

    #[test]
    fn empty_input_never_reaches_the_relay() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FallbackLog::new(dir.path().join("fallback.log"));
        let mut sink = MemorySink::new();
        let mut relay = Relay::new(Ok(&mut sink), fallback.clone(), Retention::default(), ctx());

        let lines: [&str; 0] = [];
        let err = ingest(&lines, Utc::now(), &mut relay, &ctx()).unwrap_err();
        drop(relay);

        assert!(matches!(err, IngestError::Parse(ParseError::Empty)));
        assert!(sink.index.is_empty());
        assert!(!fallback.path().exists());
    }
}

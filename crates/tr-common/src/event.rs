//! Canonical trap records and their wire envelope.
//!
//! A [`TrapEvent`] is built once per notification by the normalizer and is
//! never mutated afterwards. On the wire (sink body, fallback files, failure
//! logs) it travels as a self-describing JSON object:
//!
//! ```json
//! {
//!   "timestamp": "2024-03-01T12:00:00.123456Z",
//!   "level": "INFO",
//!   "message": "SNMP trap received",
//!   "event_id": "1709294400123-a1b2c3d4",
//!   "trap": {
//!     "host": "host-a", "source_ip": "10.0.0.5", "transport": "UDP: [10.0.0.5]:161->",
//!     "oid": "SNMPv2-MIB::linkDown", "name": "linkDown", "severity": "info",
//!     "uptime": "", "varbind_count": 2
//!   },
//!   "varbinds": [{"oid": "SNMPv2-MIB::snmpTrapOID.0", "value": "SNMPv2-MIB::linkDown"}],
//!   "metadata": {"handler_version": "2.0", "processed_lines": 4}
//! }
//! ```

use crate::error::{Error, Result};
use crate::id::EventId;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handler version stamped into every envelope.
pub const HANDLER_VERSION: &str = "2.0";

/// Envelope message for received traps.
pub const ENVELOPE_MESSAGE: &str = "SNMP trap received";

/// Trap severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    #[default]
    Info,
    Clear,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Info,
        Severity::Clear,
    ];

    /// Lowercase label used on the wire and in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Info => "info",
            Severity::Clear => "clear",
        }
    }

    /// Parse a label exactly as written on the wire (case-insensitive).
    pub fn from_label(label: &str) -> Option<Severity> {
        Severity::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for Severity {
    /// Lenient decode: unknown labels degrade to `info`.
    fn from(s: String) -> Self {
        Severity::from_label(&s).unwrap_or_default()
    }
}

/// One identifier/value pair, in protocol order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Varbind {
    pub oid: String,
    pub value: String,
}

impl Varbind {
    pub fn new(oid: impl Into<String>, value: impl Into<String>) -> Self {
        Varbind {
            oid: oid.into(),
            value: value.into(),
        }
    }
}

/// The canonical trap record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapEvent {
    /// Sink-native identity, minted once.
    pub event_id: EventId,
    /// Receive instant, truncated to microseconds so the wire form is lossless.
    pub timestamp: DateTime<Utc>,
    /// Reporting agent identity (line 1).
    pub host: String,
    /// Raw transport descriptor (line 2).
    pub transport: String,
    /// Address extracted from `transport`; empty if unextractable.
    pub source_ip: String,
    pub trap_oid: String,
    pub trap_name: String,
    pub uptime: String,
    pub severity: Severity,
    pub varbinds: Vec<Varbind>,
    /// Number of raw input lines the notification had.
    pub line_count: usize,
}

impl TrapEvent {
    /// Normalize a timestamp to the precision carried on the wire.
    pub fn wire_timestamp(at: DateTime<Utc>) -> DateTime<Utc> {
        at.trunc_subsecs(6)
    }

    /// ISO-8601, `Z`-suffixed, microsecond precision.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Serialize to one JSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(&Envelope::from(self))?)
    }

    /// Decode an envelope produced by [`TrapEvent::to_json_line`].
    ///
    /// Missing optional sections decode to empty values. A missing or
    /// unparsable timestamp is a decode error. Envelopes without an
    /// `event_id` get one minted from their timestamp.
    pub fn decode(body: &str) -> Result<TrapEvent> {
        let envelope: Envelope =
            serde_json::from_str(body).map_err(|e| Error::Decode(e.to_string()))?;
        envelope.try_into()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    timestamp: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_id: Option<EventId>,
    #[serde(default)]
    trap: TrapSection,
    #[serde(default)]
    varbinds: Vec<Varbind>,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct TrapSection {
    host: String,
    source_ip: String,
    transport: String,
    oid: String,
    name: String,
    severity: Severity,
    uptime: String,
    varbind_count: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Metadata {
    handler_version: String,
    processed_lines: usize,
}

impl From<&TrapEvent> for Envelope {
    fn from(event: &TrapEvent) -> Self {
        Envelope {
            timestamp: event.timestamp_string(),
            level: "INFO".to_string(),
            message: ENVELOPE_MESSAGE.to_string(),
            event_id: Some(event.event_id.clone()),
            trap: TrapSection {
                host: event.host.clone(),
                source_ip: event.source_ip.clone(),
                transport: event.transport.clone(),
                oid: event.trap_oid.clone(),
                name: event.trap_name.clone(),
                severity: event.severity,
                uptime: event.uptime.clone(),
                varbind_count: event.varbinds.len(),
            },
            varbinds: event.varbinds.clone(),
            metadata: Metadata {
                handler_version: HANDLER_VERSION.to_string(),
                processed_lines: event.line_count,
            },
        }
    }
}

impl TryFrom<Envelope> for TrapEvent {
    type Error = Error;

    fn try_from(envelope: Envelope) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&envelope.timestamp)
            .map_err(|e| Error::Decode(format!("timestamp {:?}: {}", envelope.timestamp, e)))?
            .with_timezone(&Utc);
        let event_id = envelope
            .event_id
            .unwrap_or_else(|| EventId::generate(timestamp));

        Ok(TrapEvent {
            event_id,
            timestamp,
            host: envelope.trap.host,
            transport: envelope.trap.transport,
            source_ip: envelope.trap.source_ip,
            trap_oid: envelope.trap.oid,
            trap_name: envelope.trap.name,
            uptime: envelope.trap.uptime,
            severity: envelope.trap.severity,
            varbinds: envelope.varbinds,
            line_count: envelope.metadata.processed_lines,
        })
    }
}

/// A varbind with its namespace-stripped name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedVarbind {
    pub oid: String,
    pub value: String,
    pub resolved_name: String,
}

/// A trap event with vendor alarm fields lifted into named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedEvent {
    pub event: TrapEvent,
    pub varbinds: Vec<FlattenedVarbind>,
    /// Raw vendor severity indicator, if one was present.
    pub alarm_severity: Option<String>,
    pub alarm_number: Option<String>,
    pub alarm_text: Option<String>,
    pub alarm_server: Option<String>,
    pub alarm_instance: Option<String>,
}

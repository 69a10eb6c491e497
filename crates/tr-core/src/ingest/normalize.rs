//! Event normalizer: parser output to canonical [`TrapEvent`].

use chrono::{DateTime, Utc};
use tr_common::{EventId, TrapEvent};

use super::parser::ParsedNotification;
use super::severity::{classify, is_vendor_severity_oid};

/// Identifier carrying the notification's own OID.
pub const TRAP_OID_ALIASES: [&str; 2] = ["SNMPv2-MIB::snmpTrapOID.0", ".1.3.6.1.6.3.1.1.4.1.0"];

/// Identifier carrying the agent's uptime.
pub const UPTIME_ALIASES: [&str; 2] = ["DISMAN-EVENT-MIB::sysUpTimeInstance", ".1.3.6.1.2.1.1.3.0"];

/// Short name of a trap OID: namespace prefix and trailing `.0` removed.
///
/// Idempotent: `trap_name(trap_name(x)) == trap_name(x)`.
pub fn trap_name(oid: &str) -> &str {
    let mut name = match oid.rfind("::") {
        Some(at) => &oid[at + 2..],
        None => oid,
    };
    while let Some(stripped) = name.strip_suffix(".0") {
        name = stripped;
    }
    name
}

/// Build the canonical event for a notification received at `at`.
///
/// Never fails; missing trap identity, uptime, or severity leave their
/// fields at defaults.
pub fn normalize(parsed: ParsedNotification, at: DateTime<Utc>) -> TrapEvent {
    let timestamp = TrapEvent::wire_timestamp(at);

    let mut trap_oid = String::new();
    let mut uptime = String::new();
    let mut vendor_severity: Option<&str> = None;

    for vb in &parsed.varbinds {
        if TRAP_OID_ALIASES.contains(&vb.oid.as_str()) {
            trap_oid.clone_from(&vb.value);
        } else if UPTIME_ALIASES.contains(&vb.oid.as_str()) {
            uptime.clone_from(&vb.value);
        } else if is_vendor_severity_oid(&vb.oid) {
            // Later severity varbinds override earlier ones.
            vendor_severity = Some(&vb.value);
        }
    }

    let severity = classify(vendor_severity);
    let trap_name = trap_name(&trap_oid).to_string();

    TrapEvent {
        event_id: EventId::generate(timestamp),
        timestamp,
        host: parsed.host,
        transport: parsed.transport,
        source_ip: parsed.source_ip,
        trap_oid,
        trap_name,
        uptime,
        severity,
        varbinds: parsed.varbinds,
        line_count: parsed.line_count,
    }
}

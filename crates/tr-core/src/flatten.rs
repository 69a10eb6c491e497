//! Flattener: lifts vendor alarm fields out of the varbind list.
//!
//! Matching is a case-insensitive substring test on the namespace-stripped
//! identifier. The first matching varbind wins per field. No varbind is
//! dropped; each gains only its `resolved_name`.

use tr_common::{FlattenedEvent, FlattenedVarbind, TrapEvent};

pub const ALARM_SEVERITY_MARKER: &str = "alarmseverity";
pub const ALARM_NUMBER_MARKER: &str = "alarmnumber";
pub const ALARM_TEXT_MARKER: &str = "alarmtext";
pub const ALARM_SERVER_MARKER: &str = "alarmserver";
pub const ALARM_INSTANCE_MARKER: &str = "alarminstance";

/// Identifier with any `namespace::` prefix removed.
pub fn resolve_name(oid: &str) -> &str {
    match oid.rfind("::") {
        Some(at) => &oid[at + 2..],
        None => oid,
    }
}

pub fn flatten(event: TrapEvent) -> FlattenedEvent {
    let mut alarm_severity = None;
    let mut alarm_number = None;
    let mut alarm_text = None;
    let mut alarm_server = None;
    let mut alarm_instance = None;

    let varbinds: Vec<FlattenedVarbind> = event
        .varbinds
        .iter()
        .map(|vb| {
            let resolved_name = resolve_name(&vb.oid).to_string();
            let lowered = resolved_name.to_ascii_lowercase();
            for (marker, slot) in [
                (ALARM_SEVERITY_MARKER, &mut alarm_severity),
                (ALARM_NUMBER_MARKER, &mut alarm_number),
                (ALARM_TEXT_MARKER, &mut alarm_text),
                (ALARM_SERVER_MARKER, &mut alarm_server),
                (ALARM_INSTANCE_MARKER, &mut alarm_instance),
            ] {
                if slot.is_none() && lowered.contains(marker) {
                    *slot = Some(vb.value.clone());
                }
            }
            FlattenedVarbind {
                oid: vb.oid.clone(),
                value: vb.value.clone(),
                resolved_name,
            }
        })
        .collect();

    FlattenedEvent {
        event,
        varbinds,
        alarm_severity,
        alarm_number,
        alarm_text,
        alarm_server,
        alarm_instance,
    }
}

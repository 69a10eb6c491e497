//! Property-based tests for the pure pipeline stages.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tr_common::{EventId, Severity, TrapEvent, Varbind};
use tr_core::consume::select_new;
use tr_core::flatten::flatten;
use tr_core::ingest::{classify, normalize, parse_notification, trap_name};

fn token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9:.\\-]{1,24}"
}

fn data_line() -> impl Strategy<Value = String> {
    (token(), "[ \t]{1,3}", "[ -~]{0,30}").prop_map(|(oid, gap, value)| format!("{oid}{gap}{value}"))
}

fn event_with(varbinds: Vec<Varbind>) -> TrapEvent {
    let ts = TrapEvent::wire_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    TrapEvent {
        event_id: EventId::generate(ts),
        timestamp: ts,
        host: "h".into(),
        transport: "UDP: [10.0.0.1]:162->".into(),
        source_ip: "10.0.0.1".into(),
        trap_oid: String::new(),
        trap_name: String::new(),
        uptime: String::new(),
        severity: Severity::Info,
        varbinds,
        line_count: 0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every well-formed data line becomes exactly one varbind, in order.
    #[test]
    fn parser_keeps_every_pair(host in token(), lines in prop::collection::vec(data_line(), 0..12)) {
        let mut input = vec![host.clone(), "UDP: [192.0.2.1]:161->".to_string()];
        input.extend(lines.iter().cloned());

        let parsed = parse_notification(&input).unwrap();
        prop_assert_eq!(parsed.host, host);
        prop_assert_eq!(parsed.source_ip, "192.0.2.1");
        prop_assert_eq!(parsed.varbinds.len(), lines.len());
        prop_assert_eq!(parsed.line_count, input.len());
        for (vb, line) in parsed.varbinds.iter().zip(&lines) {
            prop_assert!(line.starts_with(&vb.oid));
        }
    }

    /// The classifier is total and stable under case and padding.
    #[test]
    fn classifier_is_total(raw in "[ -~]{0,12}") {
        let sev = classify(Some(raw.as_str()));
        let padded = format!("  {}  ", raw.to_uppercase());
        prop_assert_eq!(classify(Some(padded.as_str())), sev);
        prop_assert!(Severity::from_label(sev.as_str()).is_some());
    }

    #[test]
    fn trap_name_is_idempotent(oid in "[A-Za-z0-9:.]{0,40}") {
        let once = trap_name(&oid);
        prop_assert_eq!(trap_name(once), once);
        prop_assert!(!once.contains("::"));
        prop_assert!(!once.ends_with(".0"));
    }

    /// Normalizing never fails and the envelope survives the wire.
    #[test]
    fn normalized_event_round_trips(host in token(), lines in prop::collection::vec(data_line(), 0..8)) {
        let mut input = vec![host, "UDP: [10.9.8.7]:161->".to_string()];
        input.extend(lines);
        let at = Utc.timestamp_opt(1_709_294_400, 123_456_789).unwrap();

        let event = normalize(parse_notification(&input).unwrap(), at);
        let decoded = TrapEvent::decode(&event.to_json_line().unwrap()).unwrap();
        prop_assert_eq!(&decoded, &event);
        prop_assert_eq!(event.timestamp.timestamp_subsec_nanos() % 1_000, 0);
    }

    /// Flattening keeps every varbind and never invents alarm fields.
    #[test]
    fn flatten_preserves_varbinds(pairs in prop::collection::vec((token(), "[ -~]{0,16}"), 0..10)) {
        let varbinds: Vec<Varbind> = pairs.iter().map(|(o, v)| Varbind::new(o.clone(), v.clone())).collect();
        let flat = flatten(event_with(varbinds.clone()));

        prop_assert_eq!(flat.varbinds.len(), varbinds.len());
        if flat.alarm_number.is_some() {
            prop_assert!(varbinds.iter().any(|vb| vb.oid.to_lowercase().contains("alarmnumber")));
        }
    }

    /// Cursor selection returns exactly the entries above the cursor.
    #[test]
    fn cursor_selects_strictly_newer(len in 0usize..20, cut in 0usize..25) {
        let index: Vec<EventId> = (0..len).rev().map(|i| EventId::from(format!("id-{i:02}"))).collect();
        let cursor = index.get(cut).cloned();
        let batch = select_new(&index, cursor.as_ref());

        let expected = match cursor {
            Some(_) => cut,
            None => len,
        };
        prop_assert_eq!(batch.pending.len(), expected);
        prop_assert!(batch.pending.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(batch.head, index.first().cloned());
    }
}

//! Fuzz target for notification parsing and normalization.
//!
//! Any line sequence must parse (or be rejected as empty) and normalize
//! without panicking.

#![no_main]

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use tr_core::flatten::flatten;
use tr_core::ingest::{normalize, parse_notification};

fuzz_target!(|data: &str| {
    let lines: Vec<&str> = data.lines().collect();
    let Ok(parsed) = parse_notification(&lines) else {
        return;
    };
    let at = Utc.timestamp_opt(1_709_294_400, 0).unwrap();
    let event = normalize(parsed, at);
    let _ = flatten(event);
});

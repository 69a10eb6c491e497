//! Fuzz target for event envelope decoding.
//!
//! Sink records and fallback lines are untrusted; decoding must fail
//! cleanly, and anything that decodes must re-encode.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tr_common::TrapEvent;

fuzz_target!(|data: &str| {
    if let Ok(event) = TrapEvent::decode(data) {
        let _ = event.to_json_line();
    }
});

//! Fuzz target for transport descriptor address extraction.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tr_core::ingest::extract_source_ip;

fuzz_target!(|data: &str| {
    let ip = extract_source_ip(data);
    // Whatever comes back was found in the input
    assert!(data.contains(ip.as_str()));
});

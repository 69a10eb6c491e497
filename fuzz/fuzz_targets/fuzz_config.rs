//! Fuzz target for trap-relay.toml parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tr_config::{validate_config, Config};

fuzz_target!(|data: &str| {
    // Parsing and validation should return errors, never panic
    if let Ok(config) = toml::from_str::<Config>(data) {
        let _ = validate_config(&config);
    }
});

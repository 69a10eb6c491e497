//! Trap Relay Core Library
//!
//! Two pipeline halves built from the same components:
//! - Ingest: parse one notification, normalize it, relay it to the sink
//!   (or a local fallback file)
//! - Consume: drain the sink behind a cursor, flatten vendor fields,
//!   persist idempotently (or append to a failure log)
//!
//! The binary entry point is in `main.rs`.

pub mod consume;
pub mod exit_codes;
pub mod fallback;
pub mod flatten;
pub mod ingest;
pub mod logging;
pub mod persist;
pub mod relay;
pub mod retry;
pub mod shutdown;

#[cfg(test)]
pub(crate) mod testing;

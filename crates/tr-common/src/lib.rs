//! Trap relay common types, IDs, and errors.
//!
//! This crate provides foundational types shared by the ingest and
//! consumption sides of the pipeline:
//! - The canonical [`TrapEvent`] and its JSON wire envelope
//! - The derived [`FlattenedEvent`]
//! - Sink-native event identity
//! - The unified error taxonomy

pub mod error;
pub mod event;
pub mod id;

pub use error::{Error, ErrorCategory, Result};
pub use event::{FlattenedEvent, FlattenedVarbind, Severity, TrapEvent, Varbind};
pub use id::EventId;

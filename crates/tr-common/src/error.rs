//! Error types for the trap relay.
//!
//! Every component error converts into [`Error`], which carries:
//! - A stable numeric code for machine parsing
//! - A category so operators can alert on sink or store degradation separately
//! - A recoverability hint used by the pipeline's propagation policy
//!
//! Only resource-initialization failures at process startup are allowed to
//! terminate a process; everything else is recovered at the nearest component
//! boundary (local fallback file) or reported and skipped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for trap relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Empty or unparsable notification input.
    Input,
    /// Delivery sink unreachable or rejecting writes.
    Sink,
    /// Relational store unreachable or rejecting writes.
    Store,
    /// Undecodable serialized event body.
    Decode,
    /// Configuration file errors.
    Config,
    /// Local file I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Sink => write!(f, "sink"),
            ErrorCategory::Store => write!(f, "store"),
            ErrorCategory::Decode => write!(f, "decode"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the trap relay.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("empty notification: no input lines received")]
    EmptyNotification,

    #[error("invalid notification: {0}")]
    InvalidNotification(String),

    // Sink errors (20-29)
    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("sink write failed: {0}")]
    SinkWrite(String),

    // Store errors (30-39)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("store write failed: {0}")]
    StoreWrite(String),

    // Decode errors (40-49)
    #[error("undecodable event body: {0}")]
    Decode(String),

    // Configuration errors (50-59)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Codes are stable and grouped by category:
    /// - 10-19: Input errors
    /// - 20-29: Sink errors
    /// - 30-39: Store errors
    /// - 40-49: Decode errors
    /// - 50-59: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::EmptyNotification => 10,
            Error::InvalidNotification(_) => 11,
            Error::SinkUnavailable(_) => 20,
            Error::SinkWrite(_) => 21,
            Error::StoreUnavailable(_) => 30,
            Error::StoreWrite(_) => 31,
            Error::Decode(_) => 40,
            Error::Config(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::EmptyNotification | Error::InvalidNotification(_) => ErrorCategory::Input,
            Error::SinkUnavailable(_) | Error::SinkWrite(_) => ErrorCategory::Sink,
            Error::StoreUnavailable(_) | Error::StoreWrite(_) => ErrorCategory::Store,
            Error::Decode(_) => ErrorCategory::Decode,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Malformed input is reported, never retried. Sink and store outages are
    /// transient; the pipeline redirects the event locally and moves on.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::EmptyNotification | Error::InvalidNotification(_) => false,
            Error::SinkUnavailable(_) | Error::SinkWrite(_) => true,
            Error::StoreUnavailable(_) | Error::StoreWrite(_) => true,
            // A poison body stays poison.
            Error::Decode(_) => false,
            Error::Config(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Notification Rejected",
            ErrorCategory::Sink => "Delivery Sink Degraded",
            ErrorCategory::Store => "Relational Store Degraded",
            ErrorCategory::Decode => "Event Decode Failed",
            ErrorCategory::Config => "Configuration Error",
            ErrorCategory::Io => "I/O Error",
        }
    }
}

//! Exit codes for the trap-relay CLI.
//!
//! Exit codes communicate operation outcome without requiring output parsing.
//! The monitoring agent that invokes `handle` only looks at the code.
//!
//! Exit code ranges:
//! - 0: Success (including "delivered to the local fallback file")
//! - 10-19: User/environment errors (recoverable by operator action)
//! - 20-29: Internal errors

/// Exit codes for trap-relay operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success: event delivered, fell back locally, or command completed.
    Clean = 0,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Empty or unreadable notification input, bad replay file.
    InputError = 10,

    /// Config file missing, malformed, or semantically invalid.
    ConfigError = 11,

    /// Relational store could not be opened after bounded retries.
    StoreUnavailable = 12,

    /// Delivery sink required by the command could not be opened.
    SinkUnavailable = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// Neither the sink nor the local fallback file accepted the event.
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        self.as_i32() >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::StoreUnavailable => "ERR_STORE_UNAVAILABLE",
            ExitCode::SinkUnavailable => "ERR_SINK_UNAVAILABLE",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::InputError.as_i32(), 10);
        assert_eq!(ExitCode::ConfigError.as_i32(), 11);
        assert_eq!(ExitCode::StoreUnavailable.as_i32(), 12);
        assert_eq!(ExitCode::SinkUnavailable.as_i32(), 13);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
        assert_eq!(ExitCode::IoError.as_i32(), 21);
    }

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::StoreUnavailable.is_user_error());
        assert!(!ExitCode::StoreUnavailable.is_internal_error());
        assert!(ExitCode::IoError.is_internal_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::InputError.to_string(), "ERR_INPUT (10)");
    }
}

//! Shared error plumbing.
//!
//! Every service error carries a grepable code and a retryable flag. Codes
//! show up in logs and on fallback analysis outcomes, so a degraded turn can be
//! traced back to the failure that caused it.

/// Grepable error code and retryable flag for structured error reporting.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

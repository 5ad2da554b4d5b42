//! Error types for reinet.

use thiserror::Error;

/// Main error type for reinet operations.
#[derive(Error, Debug)]
pub enum ReinetError {
    /// A route pattern could not be compiled.
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Handler parameter count does not match the pattern's capture slots.
    #[error("handler for {pattern:?} takes {found} parameter(s) but the pattern captures {expected}")]
    ArityMismatch {
        pattern: String,
        expected: usize,
        found: usize,
    },

    /// No session provider is registered under the given name.
    #[error("unknown session provider: {0}")]
    UnknownProvider(String),

    /// Header value contained characters not allowed in HTTP headers.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    /// The secure random source failed.
    #[error("random source unavailable: {0}")]
    Entropy(String),

    /// A session value could not be (de)serialized.
    #[error("session value error: {0}")]
    SessionValue(#[from] serde_json::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for reinet operations.
pub type Result<T> = std::result::Result<T, ReinetError>;

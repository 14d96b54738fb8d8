//! Browser error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the browser engine and its ambient layers
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Browser Contract Errors
    // ─────────────────────────────────────────────────────────────
    /// Operation invoked in a state that forbids it. Always an ordering bug
    /// in the caller; never retried.
    #[error("Invalid state: {operation} not allowed while {state}")]
    InvalidState { operation: String, state: String },

    /// Identity lookup or owner walk found no match.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The store collaborator reported an error for a fetch.
    #[error("Fetch failed: {message}")]
    FetchFailed { message: String },

    // ─────────────────────────────────────────────────────────────
    // Store Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Fixture error: {message}")]
    Fixture { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn invalid_state(operation: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Expected runtime conditions that callers degrade around gracefully.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::FetchFailed { .. })
    }

    /// Programming/ordering errors that must reach the UI as a visible fault.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::InvalidState { .. })
    }
}

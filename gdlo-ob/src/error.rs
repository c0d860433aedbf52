//! Error types for the observer

use thiserror::Error;

/// Why a raw listing payload could not be turned into records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Structurally unexpected payload
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Empty payload, the upstream throttling response
    #[error("Empty payload (upstream throttling)")]
    Blocked,

    /// Explicit `-1` rejection
    #[error("Request rejected by upstream")]
    Rejected,
}

/// Transport-level failure talking to the game server
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Webhook delivery failure
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {0}")]
    Status(u16),
}

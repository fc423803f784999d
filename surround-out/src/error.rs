//! Error types for surround-out
//!
//! Only stream start can fail from the caller's point of view. Latency
//! query, stop and volume failures are logged where they happen and never
//! reach the caller; they still have variants so backends can report them.

use thiserror::Error;

/// Main error type for surround-out
#[derive(Error, Debug)]
pub enum Error {
    /// No audio backend context could be obtained
    #[error("Audio backend context unavailable")]
    ContextUnavailable,

    /// Backend rejected stream creation
    #[error("Stream initialization failed: {0}")]
    StreamInitFailed(String),

    /// Backend rejected playback start
    #[error("Stream start failed: {0}")]
    StreamStartFailed(String),

    /// Backend could not report its minimum latency (non-fatal)
    #[error("Minimum latency query failed: {0}")]
    LatencyQueryFailed(String),

    /// Backend reported an error while stopping (non-fatal)
    #[error("Stream stop failed: {0}")]
    StopFailed(String),

    /// Backend rejected a volume change (non-fatal)
    #[error("Volume change failed: {0}")]
    VolumeFailed(String),

    /// Operation not valid in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] surround_common::Error),
}

/// Convenience Result type using surround-out Error
pub type Result<T> = std::result::Result<T, Error>;

//! Ingester error types.

use thiserror::Error;

/// Connection-level failures of the feed. Every variant is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The connection could not be opened.
    #[error("feed connect failed: {0}")]
    Connect(String),
    /// The connection broke while reading or writing.
    #[error("feed transport error: {0}")]
    Transport(String),
    /// The subscribe frame could not be built or sent.
    #[error("feed subscribe failed: {0}")]
    Subscribe(String),
    /// The stream ended without a close frame.
    #[error("feed stream ended unexpectedly")]
    StreamEnded,
}

/// Result type for ingester operations.
pub type Result<T> = std::result::Result<T, IngestError>;

//! Execution error types.

use thiserror::Error;

/// Errors reported by an execution client.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The venue refused the request outright.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The client could not reach the venue.
    #[error("transport error: {0}")]
    Transport(String),

    /// The channel events are delivered through is closed.
    #[error("event channel closed")]
    ChannelClosed,
}

//! Strategy runner error types.

use thiserror::Error;

/// Errors that can occur during strategy runner execution.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Strategy error.
    #[error("strategy error: {0}")]
    Strategy(#[from] strategy_core::StrategyError),

    /// The runner task is gone or dropped a reply.
    #[error("channel closed")]
    ChannelClosed,

    /// A producer channel is full.
    #[error("{0} channel full")]
    ChannelFull(&'static str),
}

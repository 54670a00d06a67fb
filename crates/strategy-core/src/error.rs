//! Strategy error types.

use execution_core::ExecutionError;
use thiserror::Error;

/// Errors raised by strategy operations.
#[derive(Debug, Error)]
pub enum StrategyError {
    // === Invalid input ===
    /// A label-like string argument is empty or blank.
    #[error("invalid {field}: must not be empty or whitespace")]
    InvalidLabel {
        /// Name of the offending argument.
        field: &'static str,
    },

    /// A numeric argument that must be positive is not.
    #[error("{field} must be positive, was {value}")]
    NotPositive {
        /// Name of the offending argument.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Alert or timer time is not strictly in the future.
    #[error("alert '{label}' time {time_ms} is not after now ({now_ms})")]
    AlertNotInFuture {
        label: String,
        time_ms: i64,
        now_ms: i64,
    },

    /// Alert or timer priority is negative.
    #[error("priority must not be negative, was {0}")]
    NegativePriority(i32),

    /// Timer interval is zero or pushes the fire time out of range.
    #[error("timer '{0}' interval must be greater than zero and keep the fire time in range")]
    InvalidInterval(String),

    // === Not found ===
    /// No bars held for the bar type.
    #[error("no bars held for {0}")]
    BarTypeNotFound(String),

    /// Bar index outside the held series.
    #[error("bar index {index} out of range for {bar_type} (len {len})")]
    BarIndexOutOfRange {
        bar_type: String,
        index: usize,
        len: usize,
    },

    /// No indicators registered for the bar type.
    #[error("no indicators registered for {0}")]
    NoIndicators(String),

    /// No indicator registered under the label.
    #[error("no indicator registered with label '{0}'")]
    IndicatorNotFound(String),

    /// No tick held for the symbol.
    #[error("no tick held for {0}")]
    TickNotFound(String),

    /// Order id not present in the ledger.
    #[error("order {0} not found in the order book")]
    OrderNotFound(String),

    /// Position id not present in the ledger.
    #[error("position {0} not found")]
    PositionNotFound(String),

    // === Duplicates ===
    /// Order id already present in the ledger.
    #[error("order id {0} already exists in the order book")]
    DuplicateOrderId(String),

    /// Indicator label already registered.
    #[error("indicator label '{0}' is already registered")]
    DuplicateIndicatorLabel(String),

    // === Registration ===
    /// No execution client has been registered.
    #[error("no execution client registered")]
    NoExecutionClient,

    /// Indicator input name outside the bar-field vocabulary.
    #[error("unknown bar field '{0}'")]
    UnknownBarField(String),

    /// Indicator received inputs it cannot use.
    #[error("indicator '{indicator}' cannot use inputs: {reason}")]
    IndicatorInput {
        indicator: String,
        reason: String,
    },

    // === Other ===
    /// A flat position has no flattening side.
    #[error("cannot flatten a flat position")]
    CannotFlatten,

    /// Execution client failure.
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Error raised by strategy code.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reject empty or whitespace-only strings.
pub(crate) fn ensure_label(value: &str, field: &'static str) -> Result<(), StrategyError> {
    if value.trim().is_empty() {
        return Err(StrategyError::InvalidLabel { field });
    }
    Ok(())
}

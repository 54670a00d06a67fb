//! Order and position identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of an order within a strategy's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a position, chosen by the strategy when submitting orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(String);

impl PositionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PositionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Generates order identifiers unique per call.
///
/// Format: `{tag}-{symbol}-{unix_millis}-{count}` where `count` increases
/// monotonically for the lifetime of the generator.
#[derive(Debug)]
pub struct OrderIdGenerator {
    tag: String,
    count: AtomicU64,
}

impl OrderIdGenerator {
    /// Create a generator with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            count: AtomicU64::new(0),
        }
    }

    /// The tag embedded in every generated identifier.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Generate a new order identifier for the given symbol.
    pub fn generate(&self, symbol: &str) -> OrderId {
        let count = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        OrderId(format!(
            "{}-{}-{}-{}",
            self.tag,
            symbol,
            model::unix_millis(),
            count
        ))
    }
}

//! Strategy configuration.

use crate::error::{ensure_label, StrategyError};

/// Per-strategy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyConfig {
    /// Distinguishes instances of the same strategy type.
    pub label: String,
    /// Tag embedded in every generated order id.
    pub order_id_tag: String,
    /// Number of bars kept per bar type.
    pub bar_capacity: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            label: "001".to_string(),
            order_id_tag: "001".to_string(),
            bar_capacity: 1000,
        }
    }
}

impl StrategyConfig {
    /// Create a new config with all default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builder method to set the order id tag.
    pub fn with_order_id_tag(mut self, tag: impl Into<String>) -> Self {
        self.order_id_tag = tag.into();
        self
    }

    /// Builder method to set the bar capacity.
    pub fn with_bar_capacity(mut self, capacity: usize) -> Self {
        self.bar_capacity = capacity;
        self
    }

    /// Check every field, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), StrategyError> {
        ensure_label(&self.label, "label")?;
        ensure_label(&self.order_id_tag, "order_id_tag")?;
        if self.bar_capacity == 0 {
            return Err(StrategyError::NotPositive {
                field: "bar_capacity",
                value: self.bar_capacity.to_string(),
            });
        }
        Ok(())
    }
}

//! Indicators and the bar-field bindings that feed them.
//!
//! An indicator is registered against a bar type together with an
//! [`IndicatorBinding`]: an ordered list of [`BarField`]s. Each new bar of
//! that type is projected through the binding and the resulting values are
//! handed to [`Indicator::update`] in binding order.

mod average;
mod pipeline;

use std::fmt;
use std::str::FromStr;

use model::Bar;
use rust_decimal::Decimal;

use crate::error::StrategyError;

pub use average::{ExponentialMovingAverage, SimpleMovingAverage};
pub use pipeline::IndicatorPipeline;

/// Stateful computation over a stream of bars.
pub trait Indicator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Feed one bar's worth of bound inputs, in binding order.
    fn update(&mut self, inputs: &[BarValue]) -> Result<(), StrategyError>;

    /// Return to the freshly constructed state.
    fn reset(&mut self);

    /// Current output, `None` until enough input has been seen.
    fn value(&self) -> Option<Decimal>;

    fn is_initialized(&self) -> bool {
        self.value().is_some()
    }
}

/// A bar field an indicator input can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Timestamp,
}

impl BarField {
    /// Read this field from a bar.
    pub fn extract(&self, bar: &Bar) -> BarValue {
        match self {
            Self::Open => BarValue::Price(bar.open),
            Self::High => BarValue::Price(bar.high),
            Self::Low => BarValue::Price(bar.low),
            Self::Close => BarValue::Price(bar.close),
            Self::Timestamp => BarValue::Timestamp(bar.timestamp_ms),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Timestamp => "timestamp",
        }
    }
}

impl FromStr for BarField {
    type Err = StrategyError;

    /// `point`, `price` and `mid` are aliases for the close.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" | "price" | "mid" | "close" => Ok(Self::Close),
            "open" => Ok(Self::Open),
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(StrategyError::UnknownBarField(other.to_string())),
        }
    }
}

impl fmt::Display for BarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value extracted from a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarValue {
    Price(Decimal),
    /// Unix milliseconds.
    Timestamp(i64),
}

impl BarValue {
    pub fn as_price(&self) -> Option<Decimal> {
        match self {
            Self::Price(price) => Some(*price),
            Self::Timestamp(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            Self::Price(_) => None,
        }
    }
}

/// Ordered field selection feeding one indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorBinding {
    fields: Vec<BarField>,
}

impl IndicatorBinding {
    pub fn new(fields: impl Into<Vec<BarField>>) -> Self {
        Self {
            fields: fields.into(),
        }
    }

    /// Bind by field names, failing on the first name outside the vocabulary.
    pub fn from_names<I, T>(names: I) -> Result<Self, StrategyError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let fields = names
            .into_iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<BarField>, _>>()?;
        Ok(Self { fields })
    }

    /// Single close-price input, the common case.
    pub fn close() -> Self {
        Self::new([BarField::Close])
    }

    pub fn fields(&self) -> &[BarField] {
        &self.fields
    }

    /// Project a bar through the binding.
    pub fn extract(&self, bar: &Bar) -> Vec<BarValue> {
        self.fields.iter().map(|field| field.extract(bar)).collect()
    }
}

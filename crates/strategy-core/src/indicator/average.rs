//! Moving averages over the first bound input.

use std::collections::VecDeque;

use rust_decimal::Decimal;

use super::{BarValue, Indicator};
use crate::error::StrategyError;

fn first_price(name: &str, inputs: &[BarValue]) -> Result<Decimal, StrategyError> {
    match inputs.first() {
        Some(BarValue::Price(price)) => Ok(*price),
        Some(BarValue::Timestamp(_)) => Err(StrategyError::IndicatorInput {
            indicator: name.to_string(),
            reason: "first input must be a price".to_string(),
        }),
        None => Err(StrategyError::IndicatorInput {
            indicator: name.to_string(),
            reason: "no inputs bound".to_string(),
        }),
    }
}

/// Simple moving average with a fixed window.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    name: String,
    period: usize,
    window: VecDeque<Decimal>,
    sum: Decimal,
}

impl SimpleMovingAverage {
    /// `period` must be non-zero.
    pub fn new(period: usize) -> Result<Self, StrategyError> {
        if period == 0 {
            return Err(StrategyError::NotPositive {
                field: "period",
                value: period.to_string(),
            });
        }
        Ok(Self {
            name: format!("SMA({period})"),
            period,
            window: VecDeque::with_capacity(period),
            sum: Decimal::ZERO,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Number of inputs seen, capped at the period.
    pub fn count(&self) -> usize {
        self.window.len()
    }

    fn push(&mut self, price: Decimal) {
        self.sum += price;
        self.window.push_back(price);
        if self.window.len() > self.period {
            if let Some(evicted) = self.window.pop_front() {
                self.sum -= evicted;
            }
        }
    }
}

impl Indicator for SimpleMovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, inputs: &[BarValue]) -> Result<(), StrategyError> {
        let price = first_price(&self.name, inputs)?;
        self.push(price);
        Ok(())
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = Decimal::ZERO;
    }

    /// Available once the window is full.
    fn value(&self) -> Option<Decimal> {
        if self.window.len() < self.period {
            return None;
        }
        Some(self.sum / Decimal::from(self.window.len()))
    }
}

/// Exponential moving average, seeded with the first input.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    name: String,
    period: usize,
    alpha: Decimal,
    value: Option<Decimal>,
}

impl ExponentialMovingAverage {
    /// Smoothing factor `2 / (period + 1)`. `period` must be non-zero.
    pub fn new(period: usize) -> Result<Self, StrategyError> {
        if period == 0 {
            return Err(StrategyError::NotPositive {
                field: "period",
                value: period.to_string(),
            });
        }
        Ok(Self {
            name: format!("EMA({period})"),
            period,
            alpha: Decimal::TWO / Decimal::from(period + 1),
            value: None,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn alpha(&self) -> Decimal {
        self.alpha
    }
}

impl Indicator for ExponentialMovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, inputs: &[BarValue]) -> Result<(), StrategyError> {
        let price = first_price(&self.name, inputs)?;
        self.value = Some(match self.value {
            None => price,
            Some(previous) => previous + self.alpha * (price - previous),
        });
        Ok(())
    }

    fn reset(&mut self) {
        self.value = None;
    }

    fn value(&self) -> Option<Decimal> {
        self.value
    }
}

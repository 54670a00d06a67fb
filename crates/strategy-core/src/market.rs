//! Latest ticks and bounded bar history.

use std::collections::{HashMap, VecDeque};

use model::{Bar, BarType, Tick};

use crate::error::StrategyError;

/// Capacity-bounded bar history for one bar type, oldest first.
#[derive(Debug, Clone)]
pub struct BarSeries {
    capacity: usize,
    bars: VecDeque<Bar>,
}

impl BarSeries {
    /// Create an empty series. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            bars: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a bar, evicting the oldest one when full.
    pub fn push(&mut self, bar: Bar) {
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bar at `index`, counting from the oldest held bar.
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Most recent bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Bar> + ExactSizeIterator {
        self.bars.iter()
    }
}

/// Market state owned by a single strategy.
///
/// Writes happen whether or not the strategy is running so a restarted
/// strategy resumes with current history.
#[derive(Debug)]
pub struct MarketState {
    bar_capacity: usize,
    /// Last tick per symbol.
    ticks: HashMap<String, Tick>,
    /// Bar history per bar type.
    bars: HashMap<BarType, BarSeries>,
}

impl MarketState {
    /// Create an empty market state keeping `bar_capacity` bars per bar type.
    pub fn new(bar_capacity: usize) -> Self {
        Self {
            bar_capacity,
            ticks: HashMap::new(),
            bars: HashMap::new(),
        }
    }

    /// Replace the last tick held for the tick's symbol.
    pub fn update_tick(&mut self, tick: Tick) {
        self.ticks.insert(tick.symbol.clone(), tick);
    }

    /// Append a bar, creating the series on first sight of the bar type.
    pub fn update_bar(&mut self, bar_type: &BarType, bar: Bar) {
        let capacity = self.bar_capacity;
        self.bars
            .entry(bar_type.clone())
            .or_insert_with(|| BarSeries::new(capacity))
            .push(bar);
    }

    pub fn bar_capacity(&self) -> usize {
        self.bar_capacity
    }

    pub fn ticks(&self) -> &HashMap<String, Tick> {
        &self.ticks
    }

    pub fn all_bars(&self) -> &HashMap<BarType, BarSeries> {
        &self.bars
    }

    /// Get the last tick for a symbol.
    pub fn last_tick(&self, symbol: &str) -> Result<&Tick, StrategyError> {
        self.ticks
            .get(symbol)
            .ok_or_else(|| StrategyError::TickNotFound(symbol.to_string()))
    }

    /// Get the bar history for a bar type.
    pub fn bars(&self, bar_type: &BarType) -> Result<&BarSeries, StrategyError> {
        self.bars
            .get(bar_type)
            .ok_or_else(|| StrategyError::BarTypeNotFound(bar_type.to_string()))
    }

    /// Get the bar at `index` (oldest first) for a bar type.
    pub fn bar(&self, bar_type: &BarType, index: usize) -> Result<&Bar, StrategyError> {
        let series = self.bars(bar_type)?;
        series
            .get(index)
            .ok_or_else(|| StrategyError::BarIndexOutOfRange {
                bar_type: bar_type.to_string(),
                index,
                len: series.len(),
            })
    }

    /// Get the most recent bar for a bar type.
    pub fn last_bar(&self, bar_type: &BarType) -> Result<&Bar, StrategyError> {
        self.bars(bar_type)?
            .last()
            .ok_or_else(|| StrategyError::BarTypeNotFound(bar_type.to_string()))
    }

    /// Drop all ticks and bars.
    pub fn clear(&mut self) {
        self.ticks.clear();
        self.bars.clear();
    }
}

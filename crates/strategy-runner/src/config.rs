//! Runner configuration.

use std::time::Duration;

use strategy_core::StrategyConfig;

/// Configuration for a strategy runner and its channels.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Settings of the hosted strategy.
    pub strategy: StrategyConfig,
    /// Capacity of the tick/bar channel.
    pub market_channel_capacity: usize,
    /// Capacity of the order/account event channel.
    pub event_channel_capacity: usize,
    /// Capacity of the start/stop/reset command channel.
    pub command_channel_capacity: usize,
    /// How often the binary logs a health snapshot.
    pub health_log_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            market_channel_capacity: 1024,
            event_channel_capacity: 1024,
            command_channel_capacity: 16,
            health_log_interval: Duration::from_secs(30),
        }
    }
}

impl RunnerConfig {
    /// Create a new config with all default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from the environment.
    ///
    /// Reads `STRATEGY_LABEL`, `STRATEGY_ORDER_ID_TAG`, `STRATEGY_BAR_CAPACITY`,
    /// `RUNNER_CHANNEL_CAPACITY` and `HEALTH_LOG_INTERVAL_SECS`. Missing or
    /// invalid values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut strategy = defaults.strategy.clone();
        if let Some(label) = common::env_string("STRATEGY_LABEL") {
            strategy = strategy.with_label(label);
        }
        if let Some(tag) = common::env_string("STRATEGY_ORDER_ID_TAG") {
            strategy = strategy.with_order_id_tag(tag);
        }
        strategy = strategy.with_bar_capacity(common::env_or(
            "STRATEGY_BAR_CAPACITY",
            defaults.strategy.bar_capacity,
        ));

        let capacity = common::env_or("RUNNER_CHANNEL_CAPACITY", defaults.market_channel_capacity);
        let health_secs = common::env_or(
            "HEALTH_LOG_INTERVAL_SECS",
            defaults.health_log_interval.as_secs(),
        );

        Self {
            strategy,
            market_channel_capacity: capacity,
            event_channel_capacity: capacity,
            command_channel_capacity: defaults.command_channel_capacity,
            health_log_interval: Duration::from_secs(health_secs),
        }
    }

    /// Builder method to set the strategy config.
    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder method to set both data channel capacities.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.market_channel_capacity = capacity;
        self.event_channel_capacity = capacity;
        self
    }

    /// Builder method to set the health log interval.
    pub fn with_health_log_interval(mut self, interval: Duration) -> Self {
        self.health_log_interval = interval;
        self
    }
}

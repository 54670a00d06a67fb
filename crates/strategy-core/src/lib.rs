//! Core strategy runtime for the trading bot.
//!
//! This crate provides the building blocks a strategy instance is made of:
//!
//! - **Strategy trait**: the six lifecycle and data callbacks every strategy implements
//! - **Context**: `StrategyContext` owning market state, indicators, the order/position
//!   ledger, the alert scheduler and the account
//! - **Engine**: `StrategyEngine` driving start/stop/reset and the single dispatch funnel
//! - **Indicators**: the `Indicator` trait, bar-field bindings and moving averages
//!
//! # Example Strategy
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use strategy_core::{Event, IndicatorBinding, SimpleMovingAverage, Strategy, StrategyContext, StrategyError};
//! use model::{Bar, BarType, Tick};
//!
//! struct SmaWatcher {
//!     bar_type: BarType,
//! }
//!
//! #[async_trait]
//! impl Strategy for SmaWatcher {
//!     fn name(&self) -> &str {
//!         "SmaWatcher"
//!     }
//!
//!     async fn on_start(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
//!         ctx.register_indicator(
//!             self.bar_type.clone(),
//!             Box::new(SimpleMovingAverage::new(20)?),
//!             IndicatorBinding::close(),
//!             "sma20",
//!         )
//!     }
//!
//!     async fn on_bar(&mut self, _bar_type: &BarType, _bar: &Bar, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
//!         if let Some(value) = ctx.indicator("sma20")?.value() {
//!             tracing::info!(%value, "sma");
//!         }
//!         Ok(())
//!     }
//!
//!     // ... on_tick, on_event, on_stop, on_reset
//! }
//! ```

mod config;
mod context;
mod engine;
mod error;
mod event;
pub mod indicator;
mod ledger;
mod market;
mod scheduler;
mod strategy;

pub use config::StrategyConfig;
pub use context::{StrategyContext, StrategyIdentity};
pub use engine::StrategyEngine;
pub use error::StrategyError;
pub use event::{Event, TimeEvent};
pub use indicator::{
    BarField, BarValue, ExponentialMovingAverage, Indicator, IndicatorBinding,
    IndicatorPipeline, SimpleMovingAverage,
};
pub use ledger::{LedgerUpdate, OrderLedger};
pub use market::{BarSeries, MarketState};
pub use scheduler::AlertScheduler;
pub use strategy::{BoxedStrategy, Strategy};

// Re-export commonly used types from dependencies for convenience
pub use execution_core::{
    Account, AccountEvent, MarketPosition, Order, OrderEvent, OrderEventKind, OrderId, OrderSide,
    OrderStatus, OrderType, Position, PositionId, TimeInForce,
};
pub use model::{Bar, BarType, MarketEvent, Tick};

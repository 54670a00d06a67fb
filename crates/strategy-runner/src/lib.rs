//! Strategy execution runtime.
//!
//! This crate hosts a [`strategy_core::StrategyEngine`] on a tokio task:
//!
//! - **StrategyRunner**: Single task that owns the engine and serializes market
//!   data, execution events, alerts and lifecycle commands
//! - **StrategyHandle**: Cloneable producer side used by feeds and clients
//! - **DryRunExecutionClient**: In-process execution client for paper trading
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  MarketEvent   ┌──────────────────┐   submit/cancel  ┌───────────────┐
//! │ Market feed │───────────────>│  StrategyRunner  │─────────────────>│ Execution     │
//! └─────────────┘                │  - engine        │                  │ client        │
//! ┌─────────────┐  start/stop    │  - alert timers  │                  └───────────────┘
//! │  Operator   │───────────────>│                  │<─────────────────────────┘
//! └─────────────┘                └──────────────────┘   Order/Account events
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use strategy_runner::{RunnerConfig, StrategyRunner};
//!
//! let config = RunnerConfig::from_env();
//! let engine = StrategyEngine::new(my_strategy, config.strategy.clone())?;
//! let (runner, handle) = StrategyRunner::new(&config, engine);
//!
//! tokio::spawn(runner.run(shutdown_rx));
//! handle.start().await?;
//! handle.send_market(event).await?;
//! ```

mod config;
mod dry_run;
mod error;
pub mod examples;
mod runner;

pub use config::RunnerConfig;
pub use dry_run::{DryRunConfig, DryRunExecutionClient};
pub use error::RunnerError;
pub use runner::{RunnerCommand, StrategyHandle, StrategyRunner};

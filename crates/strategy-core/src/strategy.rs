//! Strategy trait definition.

use async_trait::async_trait;
use model::{Bar, BarType, Tick};

use crate::context::StrategyContext;
use crate::error::StrategyError;
use crate::event::Event;

/// Core trait for implementing trading strategies.
///
/// Every callback is required. The engine owns the [`StrategyContext`] and
/// lends it mutably for the duration of each call.
///
/// # Lifecycle
///
/// 1. `on_start` - Called once per `start()`, after the account inquiry
/// 2. `on_tick` / `on_bar` - Called for market data while running
/// 3. `on_event` - Called for order, account and time events while running
/// 4. `on_stop` - Called once per `stop()`, before timers are cancelled
/// 5. `on_reset` - Called by `reset()` while stopped, after state is cleared
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use strategy_core::{Event, Strategy, StrategyContext, StrategyError};
/// use model::{Bar, BarType, Tick};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Strategy for Noop {
///     fn name(&self) -> &str {
///         "Noop"
///     }
///
///     async fn on_start(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
///         Ok(())
///     }
///
///     async fn on_tick(&mut self, _tick: &Tick, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
///         Ok(())
///     }
///
///     // ... on_bar, on_event, on_stop, on_reset
/// }
/// ```
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy type name, combined with the configured label for identity.
    fn name(&self) -> &str;

    /// Called when the strategy starts.
    ///
    /// Typically registers indicators and timers. An error here aborts the
    /// start and leaves the strategy stopped.
    async fn on_start(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError>;

    async fn on_tick(&mut self, tick: &Tick, ctx: &mut StrategyContext) -> Result<(), StrategyError>;

    /// Called after the bar has been stored and indicators updated.
    async fn on_bar(
        &mut self,
        bar_type: &BarType,
        bar: &Bar,
        ctx: &mut StrategyContext,
    ) -> Result<(), StrategyError>;

    /// Called after the ledger or account has absorbed the event.
    async fn on_event(&mut self, event: &Event, ctx: &mut StrategyContext) -> Result<(), StrategyError>;

    /// Use this to cancel working orders or flatten positions.
    async fn on_stop(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError>;

    /// Use this to clear strategy-side state.
    async fn on_reset(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError>;
}

/// A boxed strategy trait object.
pub type BoxedStrategy = Box<dyn Strategy>;

#[async_trait]
impl Strategy for BoxedStrategy {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    async fn on_start(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        self.as_mut().on_start(ctx).await
    }

    async fn on_tick(&mut self, tick: &Tick, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        self.as_mut().on_tick(tick, ctx).await
    }

    async fn on_bar(
        &mut self,
        bar_type: &BarType,
        bar: &Bar,
        ctx: &mut StrategyContext,
    ) -> Result<(), StrategyError> {
        self.as_mut().on_bar(bar_type, bar, ctx).await
    }

    async fn on_event(&mut self, event: &Event, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        self.as_mut().on_event(event, ctx).await
    }

    async fn on_stop(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        self.as_mut().on_stop(ctx).await
    }

    async fn on_reset(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        self.as_mut().on_reset(ctx).await
    }
}

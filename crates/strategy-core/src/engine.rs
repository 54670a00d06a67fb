//! Strategy engine: lifecycle and the dispatch funnel.
//!
//! The engine pairs a [`Strategy`] with its [`StrategyContext`] and is the
//! only path through which market data, execution events and fired alerts
//! reach either. Everything here takes `&mut self`; callers that need
//! concurrency wrap the engine in a single task.

use execution_core::{SharedExecutionClient, SharedPositionStore};
use metrics::SharedMetrics;
use model::{Bar, BarType, MarketEvent, Tick};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::StrategyConfig;
use crate::context::StrategyContext;
use crate::error::StrategyError;
use crate::event::Event;
use crate::ledger::LedgerUpdate;
use crate::strategy::Strategy;

/// Drives one strategy instance.
pub struct StrategyEngine<S: Strategy> {
    strategy: S,
    ctx: StrategyContext,
}

impl<S: Strategy> StrategyEngine<S> {
    /// Create a stopped engine. Fails if the config is invalid.
    pub fn new(strategy: S, config: StrategyConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        let ctx = StrategyContext::new(strategy.name(), &config);
        info!(strategy = %ctx.identity(), id = %ctx.id(), "strategy initialized");
        Ok(Self { strategy, ctx })
    }

    /// Builder method to replace the closed-position store.
    pub fn with_position_store(mut self, store: SharedPositionStore) -> Self {
        self.ctx.set_position_store(store);
        self
    }

    /// Builder method to share a metrics collector.
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.ctx.set_metrics(metrics);
        self
    }

    /// Attach the execution client and take its account as the strategy's.
    pub fn register_execution_client(&mut self, client: SharedExecutionClient) {
        info!(
            strategy = %self.ctx.identity(),
            account_id = %client.account().account_id,
            "execution client registered"
        );
        self.ctx.set_execution_client(client);
    }

    pub fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    /// Mutable context access for setup outside callbacks.
    pub fn context_mut(&mut self) -> &mut StrategyContext {
        &mut self.ctx
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn metrics(&self) -> &SharedMetrics {
        self.ctx.metrics()
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_running()
    }

    // --- Lifecycle ---

    /// Inquire collateral, mark running and call `on_start`.
    ///
    /// Does not block on alerts; the driver fires them via
    /// [`fire_due_alerts`](Self::fire_due_alerts).
    pub async fn start(&mut self) -> Result<(), StrategyError> {
        if self.ctx.is_running() {
            warn!(strategy = %self.ctx.identity(), "start called while already running");
            return Ok(());
        }

        let client = self.ctx.execution_client()?;
        info!(strategy = %self.ctx.identity(), "starting");
        client.collateral_inquiry().await?;

        self.ctx.set_running(true);
        let mark = self.ctx.scheduler().mark();
        if let Err(e) = self.strategy.on_start(&mut self.ctx).await {
            error!(strategy = %self.ctx.identity(), error = %e, "on_start failed");
            self.ctx.set_running(false);
            // Drop whatever the failed on_start scheduled, plus any repeating timers.
            self.ctx.scheduler_mut().cancel_since(mark);
            self.ctx.scheduler_mut().cancel_repeating();
            return Err(e);
        }

        info!(strategy = %self.ctx.identity(), "running");
        Ok(())
    }

    /// Call `on_stop`, mark stopped and cancel repeating timers.
    ///
    /// The transition always completes; an `on_stop` error is returned
    /// afterwards.
    pub async fn stop(&mut self) -> Result<(), StrategyError> {
        if !self.ctx.is_running() {
            warn!(strategy = %self.ctx.identity(), "stop called while not running");
            return Ok(());
        }

        info!(strategy = %self.ctx.identity(), "stopping");
        let result = self.strategy.on_stop(&mut self.ctx).await;
        self.ctx.set_running(false);

        let cancelled = self.ctx.scheduler_mut().cancel_repeating();
        if cancelled > 0 {
            debug!(strategy = %self.ctx.identity(), cancelled, "repeating timers cancelled");
        }

        if let Err(e) = &result {
            error!(strategy = %self.ctx.identity(), error = %e, "on_stop failed");
        }
        info!(strategy = %self.ctx.identity(), "stopped");
        result
    }

    /// Clear market data, reset indicators and call `on_reset`.
    ///
    /// Ignored with a warning while running.
    pub async fn reset(&mut self) -> Result<(), StrategyError> {
        if self.ctx.is_running() {
            warn!(strategy = %self.ctx.identity(), "cannot reset a running strategy");
            return Ok(());
        }

        self.ctx.market_mut().clear();
        self.ctx.indicators_mut().reset_all();
        self.strategy.on_reset(&mut self.ctx).await?;

        info!(strategy = %self.ctx.identity(), "reset");
        Ok(())
    }

    // --- Market data ---

    /// Store the tick and, if running, call `on_tick`.
    pub async fn update_tick(&mut self, tick: Tick) {
        self.ctx.metrics().inc_ticks_received();
        self.ctx.market_mut().update_tick(tick.clone());

        if self.ctx.is_running() {
            let result = self.strategy.on_tick(&tick, &mut self.ctx).await;
            self.report_callback("on_tick", result);
        }
    }

    /// Store the bar, update bound indicators and, if running, call `on_bar`.
    pub async fn update_bar(&mut self, bar_type: BarType, bar: Bar) {
        self.ctx.metrics().inc_bars_received();
        self.ctx.market_mut().update_bar(&bar_type, bar.clone());
        let failures = self.ctx.indicators_mut().update(&bar_type, &bar);
        for _ in 0..failures {
            self.ctx.metrics().inc_callback_errors();
        }

        if self.ctx.is_running() {
            let result = self.strategy.on_bar(&bar_type, &bar, &mut self.ctx).await;
            self.report_callback("on_bar", result);
        }
    }

    /// Route a market event to `update_tick` or `update_bar`.
    pub async fn handle_market_event(&mut self, event: MarketEvent) {
        match event {
            MarketEvent::Tick(tick) => self.update_tick(tick).await,
            MarketEvent::Bar(bar_type, bar) => self.update_bar(bar_type, bar).await,
        }
    }

    // --- Events ---

    /// Apply an event to the ledger or account and, if running, call
    /// `on_event`.
    pub async fn dispatch(&mut self, event: Event) {
        debug!(strategy = %self.ctx.identity(), event = %event, "dispatching");
        self.ctx.metrics().inc_events_dispatched();

        match &event {
            Event::Order(order_event) => {
                let update = self.ctx.ledger_mut().apply(order_event);
                self.absorb_ledger_update(update);
            }
            Event::Account(account_event) => match self.ctx.account_mut() {
                Some(account) => account.apply(account_event),
                None => {
                    warn!(
                        strategy = %self.ctx.identity(),
                        account_id = %account_event.account_id,
                        "account event with no account registered"
                    );
                    self.ctx.metrics().inc_ledger_warnings();
                }
            },
            Event::Time(_) => self.ctx.metrics().inc_time_events_fired(),
        }

        if self.ctx.is_running() {
            let result = self.strategy.on_event(&event, &mut self.ctx).await;
            self.report_callback("on_event", result);
        }
    }

    fn absorb_ledger_update(&mut self, update: LedgerUpdate) {
        match update {
            LedgerUpdate::PositionClosed(position) => {
                self.ctx.metrics().inc_positions_closed();
                self.ctx.position_store().save(position);
            }
            update if update.is_anomaly() => self.ctx.metrics().inc_ledger_warnings(),
            _ => {}
        }
    }

    // --- Alerts ---

    /// Dispatch every alert or timer due at `now`. Returns how many fired.
    ///
    /// Nothing fires while stopped; due one-shot alerts stay queued and are
    /// delivered after the next `start()`.
    pub async fn fire_due_alerts(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while self.ctx.is_running() {
            let Some(event) = self.ctx.scheduler_mut().pop_due(now, true) else {
                break;
            };
            self.dispatch(Event::Time(event)).await;
            fired += 1;
        }
        fired
    }

    /// When the next alert or timer is due.
    pub fn next_alert_deadline(&self) -> Option<Instant> {
        self.ctx.scheduler().next_deadline()
    }

    fn report_callback(&self, callback: &'static str, result: Result<(), StrategyError>) {
        if let Err(e) = result {
            error!(strategy = %self.ctx.identity(), callback, error = %e, "callback failed");
            self.ctx.metrics().inc_callback_errors();
        }
    }

    /// Consume the engine, returning the strategy and its context.
    pub fn into_parts(self) -> (S, StrategyContext) {
        (self.strategy, self.ctx)
    }
}

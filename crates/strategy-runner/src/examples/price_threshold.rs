//! Price threshold strategy example.
//!
//! This strategy buys when the bar close drops below a threshold
//! and flattens when it rises above another threshold.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use strategy_core::{
    Bar, BarType, Event, IndicatorBinding, Order, OrderEventKind, OrderId, OrderSide, PositionId,
    SimpleMovingAverage, Strategy, StrategyContext, StrategyError, Tick,
};

const SMA_LABEL: &str = "sma";
const HEARTBEAT_LABEL: &str = "heartbeat";

/// Configuration for the price threshold strategy.
#[derive(Debug, Clone)]
pub struct PriceThresholdConfig {
    /// Bars that drive the strategy.
    pub bar_type: BarType,
    /// Buy when the close drops below this threshold.
    pub buy_threshold: Decimal,
    /// Flatten when the close rises above this threshold.
    pub sell_threshold: Decimal,
    /// Quantity to trade.
    pub quantity: Decimal,
    /// Minimum time between orders in milliseconds.
    pub cooldown_ms: i64,
    /// Period of the moving average used as a trend filter.
    pub sma_period: usize,
    /// Interval of the status heartbeat timer.
    pub heartbeat_interval: Duration,
}

/// A simple price threshold strategy.
///
/// Entries additionally require the close to sit at or below its moving
/// average once the average is warmed up. Only one position is held at a
/// time.
pub struct PriceThresholdStrategy {
    config: PriceThresholdConfig,
    position_id: Option<PositionId>,
    pending_order: Option<OrderId>,
    last_signal_ms: Option<i64>,
    entries: u64,
}

impl PriceThresholdStrategy {
    pub fn new(config: PriceThresholdConfig) -> Self {
        Self {
            config,
            position_id: None,
            pending_order: None,
            last_signal_ms: None,
            entries: 0,
        }
    }

    pub fn config(&self) -> &PriceThresholdConfig {
        &self.config
    }

    /// Id of the position currently held, if any.
    pub fn position_id(&self) -> Option<&PositionId> {
        self.position_id.as_ref()
    }

    /// Check if cooldown has elapsed since last signal.
    fn cooldown_elapsed(&self, current_time_ms: i64) -> bool {
        match self.last_signal_ms {
            None => true,
            Some(last) => current_time_ms - last >= self.config.cooldown_ms,
        }
    }

    fn trend_allows_entry(&self, close: Decimal, ctx: &StrategyContext) -> bool {
        match ctx.indicator(SMA_LABEL).ok().and_then(|sma| sma.value()) {
            Some(average) => close <= average,
            None => true,
        }
    }

    /// Drop the tracked position id once the ledger no longer holds it.
    fn forget_closed_position(&mut self, ctx: &StrategyContext) {
        let still_open = self
            .position_id
            .as_ref()
            .is_some_and(|id| ctx.positions().contains_key(id));
        if !still_open {
            self.position_id = None;
        }
    }

    async fn enter(&mut self, bar: &Bar, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        self.entries += 1;
        let position_id = PositionId::new(format!("{}-P{}", ctx.label(), self.entries));
        let symbol = self.config.bar_type.symbol.clone();
        let order_id = ctx.generate_order_id(&symbol);
        let order = Order::market(
            order_id.clone(),
            symbol,
            OrderSide::Buy,
            self.config.quantity,
            bar.timestamp_ms,
        );

        info!(
            price = %bar.close,
            threshold = %self.config.buy_threshold,
            position_id = %position_id,
            "Price below buy threshold"
        );

        let previous_signal_ms = self.last_signal_ms.replace(bar.timestamp_ms);
        self.pending_order = Some(order_id);
        self.position_id = Some(position_id.clone());
        if let Err(e) = ctx.submit_order(order, position_id).await {
            self.pending_order = None;
            self.position_id = None;
            self.last_signal_ms = previous_signal_ms;
            return Err(e);
        }
        Ok(())
    }

    async fn exit(
        &mut self,
        position_id: PositionId,
        bar: &Bar,
        ctx: &mut StrategyContext,
    ) -> Result<(), StrategyError> {
        let position = ctx.position(&position_id)?;
        let side = ctx.flatten_side(position.market_position())?;
        let quantity = position.abs_quantity();
        let symbol = position.symbol.clone();

        info!(
            price = %bar.close,
            threshold = %self.config.sell_threshold,
            position_id = %position_id,
            "Price above sell threshold"
        );

        let order_id = ctx.generate_order_id(&symbol);
        let order = Order::market(order_id.clone(), symbol, side, quantity, bar.timestamp_ms);
        let previous_signal_ms = self.last_signal_ms.replace(bar.timestamp_ms);
        self.pending_order = Some(order_id);
        if let Err(e) = ctx.submit_order(order, position_id).await {
            self.pending_order = None;
            self.last_signal_ms = previous_signal_ms;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl Strategy for PriceThresholdStrategy {
    fn name(&self) -> &str {
        "PriceThreshold"
    }

    async fn on_start(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        if ctx.indicator(SMA_LABEL).is_err() {
            ctx.register_indicator(
                self.config.bar_type.clone(),
                Box::new(SimpleMovingAverage::new(self.config.sma_period)?),
                IndicatorBinding::close(),
                SMA_LABEL,
            )?;
        }

        let start_ms = ctx.now_ms() + 1;
        ctx.set_timer(HEARTBEAT_LABEL, start_ms, self.config.heartbeat_interval, 0, true)?;

        info!(
            strategy = %ctx.identity(),
            bar_type = %self.config.bar_type,
            buy_threshold = %self.config.buy_threshold,
            sell_threshold = %self.config.sell_threshold,
            quantity = %self.config.quantity,
            "Price threshold strategy started"
        );
        Ok(())
    }

    async fn on_tick(&mut self, _tick: &Tick, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        Ok(())
    }

    async fn on_bar(
        &mut self,
        bar_type: &BarType,
        bar: &Bar,
        ctx: &mut StrategyContext,
    ) -> Result<(), StrategyError> {
        // Only process our own bars
        if *bar_type != self.config.bar_type {
            return Ok(());
        }
        if self.pending_order.is_some() || !self.cooldown_elapsed(bar.timestamp_ms) {
            return Ok(());
        }

        let open_position = self
            .position_id
            .clone()
            .filter(|id| ctx.positions().contains_key(id));

        match open_position {
            None if bar.close < self.config.buy_threshold => {
                if self.trend_allows_entry(bar.close, ctx) {
                    self.enter(bar, ctx).await?;
                } else {
                    debug!(price = %bar.close, "entry blocked by trend filter");
                }
            }
            Some(position_id) if bar.close > self.config.sell_threshold => {
                self.exit(position_id, bar, ctx).await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn on_event(&mut self, event: &Event, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        match event {
            Event::Order(order_event) => {
                if self.pending_order.as_ref() != Some(&order_event.order_id) {
                    return Ok(());
                }
                match &order_event.kind {
                    OrderEventKind::Filled(_) => {
                        self.pending_order = None;
                        self.forget_closed_position(ctx);
                    }
                    OrderEventKind::Rejected { reason } => {
                        warn!(order_id = %order_event.order_id, %reason, "order rejected");
                        self.pending_order = None;
                        self.forget_closed_position(ctx);
                    }
                    OrderEventKind::Cancelled | OrderEventKind::Expired => {
                        self.pending_order = None;
                    }
                    _ => {}
                }
            }
            Event::Time(time) if time.label == HEARTBEAT_LABEL => {
                debug!(
                    position_id = ?self.position_id,
                    pending_order = ?self.pending_order,
                    sma = ?ctx.indicator(SMA_LABEL).ok().and_then(|sma| sma.value()),
                    "heartbeat"
                );
            }
            _ => {}
        }
        Ok(())
    }

    async fn on_stop(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        let working: Vec<OrderId> = ctx
            .ledger()
            .active_orders()
            .map(|order| order.id.clone())
            .collect();
        for order_id in working {
            ctx.cancel_order(&order_id, "NONE").await?;
        }

        info!(
            strategy = %ctx.identity(),
            position_id = ?self.position_id,
            "Price threshold strategy stopped"
        );
        Ok(())
    }

    async fn on_reset(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        self.position_id = None;
        self.pending_order = None;
        self.last_signal_ms = None;
        Ok(())
    }
}

//! Strategy context: everything a strategy owns besides its own fields.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use execution_core::{
    Account, InMemoryPositionStore, MarketPosition, Order, OrderId, OrderIdGenerator, OrderSide,
    Position, PositionId, SharedExecutionClient, SharedPositionStore,
};
use metrics::SharedMetrics;
use model::{Bar, BarType, Tick};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::config::StrategyConfig;
use crate::error::{ensure_label, StrategyError};
use crate::indicator::{Indicator, IndicatorBinding, IndicatorPipeline};
use crate::ledger::OrderLedger;
use crate::market::{BarSeries, MarketState};
use crate::scheduler::AlertScheduler;

/// Who a strategy instance is.
///
/// Two identities are equal when name and label match; the id is unique per
/// instance and only used for correlation.
#[derive(Debug, Clone)]
pub struct StrategyIdentity {
    pub name: String,
    pub label: String,
    pub id: Uuid,
}

impl StrategyIdentity {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            id: Uuid::new_v4(),
        }
    }
}

impl PartialEq for StrategyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.label == other.label
    }
}

impl Eq for StrategyIdentity {}

impl Hash for StrategyIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.label.hash(state);
    }
}

impl fmt::Display for StrategyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.label)
    }
}

/// State handed to every strategy callback.
///
/// Owned by the engine; strategies only ever see it through `&mut` during a
/// callback, so there is exactly one writer.
pub struct StrategyContext {
    identity: StrategyIdentity,
    running: bool,
    market: MarketState,
    indicators: IndicatorPipeline,
    ledger: OrderLedger,
    scheduler: AlertScheduler,
    account: Option<Account>,
    order_ids: OrderIdGenerator,
    execution: Option<SharedExecutionClient>,
    position_store: SharedPositionStore,
    metrics: SharedMetrics,
}

impl StrategyContext {
    /// Create a context from a validated config.
    pub fn new(name: impl Into<String>, config: &StrategyConfig) -> Self {
        Self {
            identity: StrategyIdentity::new(name, config.label.clone()),
            running: false,
            market: MarketState::new(config.bar_capacity),
            indicators: IndicatorPipeline::new(),
            ledger: OrderLedger::new(),
            scheduler: AlertScheduler::new(),
            account: None,
            order_ids: OrderIdGenerator::new(config.order_id_tag.clone()),
            execution: None,
            position_store: Arc::new(InMemoryPositionStore::new()),
            metrics: metrics::create_metrics(),
        }
    }

    // --- Identity ---

    pub fn identity(&self) -> &StrategyIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn label(&self) -> &str {
        &self.identity.label
    }

    pub fn id(&self) -> Uuid {
        self.identity.id
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    // --- Market state ---

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub(crate) fn market_mut(&mut self) -> &mut MarketState {
        &mut self.market
    }

    pub fn ticks(&self) -> &HashMap<String, Tick> {
        self.market.ticks()
    }

    pub fn all_bars(&self) -> &HashMap<BarType, BarSeries> {
        self.market.all_bars()
    }

    pub fn last_tick(&self, symbol: &str) -> Result<&Tick, StrategyError> {
        self.market.last_tick(symbol)
    }

    pub fn bars(&self, bar_type: &BarType) -> Result<&BarSeries, StrategyError> {
        self.market.bars(bar_type)
    }

    pub fn bar(&self, bar_type: &BarType, index: usize) -> Result<&Bar, StrategyError> {
        self.market.bar(bar_type, index)
    }

    pub fn last_bar(&self, bar_type: &BarType) -> Result<&Bar, StrategyError> {
        self.market.last_bar(bar_type)
    }

    // --- Indicators ---

    /// Register an indicator fed from bars of `bar_type`.
    pub fn register_indicator(
        &mut self,
        bar_type: BarType,
        indicator: Box<dyn Indicator>,
        binding: IndicatorBinding,
        label: impl Into<String>,
    ) -> Result<(), StrategyError> {
        self.indicators.register(bar_type, indicator, binding, label)
    }

    pub fn indicators(&self, bar_type: &BarType) -> Result<Vec<&dyn Indicator>, StrategyError> {
        self.indicators.indicators(bar_type)
    }

    pub fn indicator(&self, label: &str) -> Result<&dyn Indicator, StrategyError> {
        self.indicators.indicator(label)
    }

    pub(crate) fn indicators_mut(&mut self) -> &mut IndicatorPipeline {
        &mut self.indicators
    }

    // --- Orders and positions ---

    /// Generate a fresh order id tagged for this strategy.
    pub fn generate_order_id(&self, symbol: &str) -> OrderId {
        self.order_ids.generate(symbol)
    }

    /// Side that would flatten the given market position.
    pub fn flatten_side(&self, market_position: MarketPosition) -> Result<OrderSide, StrategyError> {
        market_position
            .flatten_side()
            .ok_or(StrategyError::CannotFlatten)
    }

    /// Record an order against `position_id` and send it.
    ///
    /// The order stays in the ledger if the client fails so later events
    /// still correlate.
    pub async fn submit_order(
        &mut self,
        order: Order,
        position_id: PositionId,
    ) -> Result<(), StrategyError> {
        let client = self.execution_client()?;
        let order_id = order.id.clone();
        self.ledger.record(order, position_id)?;

        info!(strategy = %self.identity, order_id = %order_id, "submitting order");
        let order = self.ledger.order(&order_id)?;
        client.submit_order(order, self.identity.id).await?;
        self.metrics.inc_orders_submitted();
        Ok(())
    }

    /// Request cancellation of a recorded order.
    pub async fn cancel_order(&mut self, order_id: &OrderId, reason: &str) -> Result<(), StrategyError> {
        ensure_label(reason, "cancel reason")?;
        let client = self.execution_client()?;
        let order = self.ledger.order(order_id)?;

        info!(strategy = %self.identity, order_id = %order_id, reason, "cancelling order");
        client.cancel_order(order, reason).await?;
        Ok(())
    }

    /// Request a price amendment of a recorded order.
    pub async fn modify_order(
        &mut self,
        order_id: &OrderId,
        new_price: Decimal,
    ) -> Result<(), StrategyError> {
        if new_price <= Decimal::ZERO {
            return Err(StrategyError::NotPositive {
                field: "new_price",
                value: new_price.to_string(),
            });
        }
        let client = self.execution_client()?;
        let order = self.ledger.order(order_id)?;

        info!(strategy = %self.identity, order_id = %order_id, new_price = %new_price, "modifying order");
        client.modify_order(order, new_price).await?;
        Ok(())
    }

    pub fn order(&self, order_id: &OrderId) -> Result<&Order, StrategyError> {
        self.ledger.order(order_id)
    }

    pub fn orders(&self) -> &HashMap<OrderId, Order> {
        self.ledger.orders()
    }

    pub fn position(&self, position_id: &PositionId) -> Result<&Position, StrategyError> {
        self.ledger.position(position_id)
    }

    /// Active positions.
    pub fn positions(&self) -> &HashMap<PositionId, Position> {
        self.ledger.positions()
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut OrderLedger {
        &mut self.ledger
    }

    // --- Account and collaborators ---

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub(crate) fn account_mut(&mut self) -> Option<&mut Account> {
        self.account.as_mut()
    }

    pub(crate) fn set_execution_client(&mut self, client: SharedExecutionClient) {
        self.account = Some(client.account());
        self.execution = Some(client);
    }

    pub fn execution_client(&self) -> Result<SharedExecutionClient, StrategyError> {
        self.execution
            .clone()
            .ok_or(StrategyError::NoExecutionClient)
    }

    pub fn position_store(&self) -> &SharedPositionStore {
        &self.position_store
    }

    pub(crate) fn set_position_store(&mut self, store: SharedPositionStore) {
        self.position_store = store;
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub(crate) fn set_metrics(&mut self, metrics: SharedMetrics) {
        self.metrics = metrics;
    }

    // --- Alerts and timers ---

    /// Current wall-clock millis on the scheduler clock.
    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms()
    }

    /// Schedule a one-shot alert. `fire_time_ms` must be in the future.
    pub fn set_time_alert(
        &mut self,
        label: &str,
        fire_time_ms: i64,
        priority: i32,
    ) -> Result<(), StrategyError> {
        self.scheduler.set_time_alert(label, fire_time_ms, priority)
    }

    /// Schedule a timer first firing at `start_time_ms + interval`.
    pub fn set_timer(
        &mut self,
        label: &str,
        start_time_ms: i64,
        interval: Duration,
        priority: i32,
        repeat: bool,
    ) -> Result<(), StrategyError> {
        self.scheduler
            .set_timer(label, start_time_ms, interval, priority, repeat)
    }

    /// Cancel every pending alert or timer with `label`.
    pub fn cancel_timer(&mut self, label: &str) -> bool {
        self.scheduler.cancel(label)
    }

    pub fn scheduler(&self) -> &AlertScheduler {
        &self.scheduler
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut AlertScheduler {
        &mut self.scheduler
    }
}

impl fmt::Display for StrategyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.identity.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_equality_ignores_id() {
        let a = StrategyIdentity::new("EmaCross", "001");
        let b = StrategyIdentity::new("EmaCross", "001");
        let c = StrategyIdentity::new("EmaCross", "002");

        assert_ne!(a.id, b.id);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "EmaCross-001");

        let set: HashSet<StrategyIdentity> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_context_defaults() {
        let config = StrategyConfig::new().with_label("L1").with_order_id_tag("T1");
        let ctx = StrategyContext::new("Demo", &config);

        assert_eq!(ctx.to_string(), "Demo-L1");
        assert!(!ctx.is_running());
        assert!(ctx.account().is_none());
        assert!(matches!(
            ctx.execution_client(),
            Err(StrategyError::NoExecutionClient)
        ));
        assert!(ctx.generate_order_id("BTCUSDT").as_str().starts_with("T1-BTCUSDT-"));
        assert_eq!(ctx.market().bar_capacity(), config.bar_capacity);
    }

    #[test]
    fn test_flatten_side() {
        let ctx = StrategyContext::new("Demo", &StrategyConfig::default());

        assert_eq!(ctx.flatten_side(MarketPosition::Long).unwrap(), OrderSide::Sell);
        assert_eq!(ctx.flatten_side(MarketPosition::Short).unwrap(), OrderSide::Buy);
        assert!(matches!(
            ctx.flatten_side(MarketPosition::Flat),
            Err(StrategyError::CannotFlatten)
        ));
    }
}

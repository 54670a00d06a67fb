//! Dry run execution client for simulated order fills.
//!
//! Orders never leave the process: every submit is acknowledged and filled
//! immediately, and the resulting events are pushed back into the runner's
//! event channel like a real venue would.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use execution_core::{
    Account, AccountEvent, ExecutionClient, ExecutionError, Fill, Order, OrderEvent,
    OrderEventKind, OrderSide, OrderType,
};
use model::unix_millis;
use strategy_core::Event;

/// Settings of the simulated account.
#[derive(Debug, Clone)]
pub struct DryRunConfig {
    pub account_id: String,
    pub currency: String,
    pub starting_cash: Decimal,
    /// Commission charged as a fraction of fill notional.
    pub commission_rate: Decimal,
}

impl Default for DryRunConfig {
    fn default() -> Self {
        Self {
            account_id: "DRY-RUN".to_string(),
            currency: "USDT".to_string(),
            starting_cash: dec!(100000),
            commission_rate: dec!(0.001),
        }
    }
}

/// Execution client that fills everything in-process.
///
/// Market orders fill at the last price seen through [`update_price`];
/// priced orders fill at their own price.
///
/// [`update_price`]: DryRunExecutionClient::update_price
pub struct DryRunExecutionClient {
    config: DryRunConfig,
    events: mpsc::Sender<Event>,
    last_prices: DashMap<String, Decimal>,
    cash: Mutex<Decimal>,
    next_execution_id: AtomicU64,
}

impl DryRunExecutionClient {
    pub fn new(config: DryRunConfig, events: mpsc::Sender<Event>) -> Self {
        let cash = Mutex::new(config.starting_cash);
        Self {
            config,
            events,
            last_prices: DashMap::new(),
            cash,
            next_execution_id: AtomicU64::new(1),
        }
    }

    /// Record the latest traded price of a symbol.
    pub fn update_price(&self, symbol: &str, price: Decimal) {
        self.last_prices.insert(symbol.to_string(), price);
    }

    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.last_prices.get(symbol).map(|price| *price)
    }

    /// Simulated cash balance.
    pub fn cash(&self) -> Decimal {
        *self.cash.lock()
    }

    fn account_event(&self, timestamp_ms: i64) -> AccountEvent {
        let mut event = AccountEvent::cash(
            self.config.account_id.clone(),
            self.config.currency.clone(),
            self.cash(),
            timestamp_ms,
        );
        event.cash_start_day = self.config.starting_cash;
        event.cash_activity_day = event.cash_balance - self.config.starting_cash;
        event
    }

    fn emit(&self, event: Event) -> Result<(), ExecutionError> {
        match self.events.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                warn!(event = %event, "event channel full, dropping simulated event");
                Err(ExecutionError::Transport("event channel full".to_string()))
            }
            Err(TrySendError::Closed(_)) => Err(ExecutionError::ChannelClosed),
        }
    }

    fn emit_order(&self, order: &Order, kind: OrderEventKind) -> Result<(), ExecutionError> {
        let event = OrderEvent::new(order.id.clone(), order.symbol.clone(), kind, unix_millis());
        self.emit(Event::Order(event))
    }

    fn fill_price(&self, order: &Order) -> Option<Decimal> {
        match order.order_type {
            OrderType::Market => self.last_price(&order.symbol),
            OrderType::Limit | OrderType::StopMarket | OrderType::StopLimit => order.price,
        }
    }
}

#[async_trait]
impl ExecutionClient for DryRunExecutionClient {
    async fn collateral_inquiry(&self) -> Result<(), ExecutionError> {
        self.emit(Event::Account(self.account_event(unix_millis())))
    }

    async fn submit_order(&self, order: &Order, strategy_id: Uuid) -> Result<(), ExecutionError> {
        debug!(order = %order, %strategy_id, "simulating order");
        self.emit_order(order, OrderEventKind::Submitted)?;

        let Some(price) = self.fill_price(order) else {
            let reason = format!("no price available for {}", order.symbol);
            warn!(order_id = %order.id, %reason, "simulated reject");
            return self.emit_order(order, OrderEventKind::Rejected { reason });
        };

        self.emit_order(order, OrderEventKind::Accepted)?;

        let execution_id = self.next_execution_id.fetch_add(1, Ordering::Relaxed);
        let notional = price * order.quantity;
        let commission = notional * self.config.commission_rate;
        let fill = Fill::new(
            format!("DRY-{execution_id}"),
            order.side,
            order.quantity,
            price,
        )
        .with_commission(commission);

        {
            let mut cash = self.cash.lock();
            match order.side {
                OrderSide::Buy => *cash -= notional + commission,
                OrderSide::Sell => *cash += notional - commission,
            }
        }

        info!(
            order_id = %order.id,
            side = %order.side,
            quantity = %order.quantity,
            %price,
            %commission,
            "simulated fill"
        );
        self.emit_order(order, OrderEventKind::Filled(fill))?;
        self.emit(Event::Account(self.account_event(unix_millis())))
    }

    async fn cancel_order(&self, order: &Order, reason: &str) -> Result<(), ExecutionError> {
        if order.status.is_terminal() {
            return self.emit_order(
                order,
                OrderEventKind::CancelRejected {
                    reason: format!("order already {:?}", order.status),
                },
            );
        }
        debug!(order_id = %order.id, reason, "simulated cancel");
        self.emit_order(order, OrderEventKind::Cancelled)
    }

    async fn modify_order(&self, order: &Order, new_price: Decimal) -> Result<(), ExecutionError> {
        if order.status.is_terminal() {
            return Err(ExecutionError::Rejected(format!(
                "order {} is {:?}",
                order.id, order.status
            )));
        }
        self.emit_order(order, OrderEventKind::Modified { price: new_price })
    }

    fn account(&self) -> Account {
        let mut account = Account::new(self.config.account_id.clone(), self.config.currency.clone());
        account.apply(&self.account_event(unix_millis()));
        account
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execution_core::{OrderId, OrderStatus};

    fn client() -> (DryRunExecutionClient, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(16);
        (DryRunExecutionClient::new(DryRunConfig::default(), tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn kinds(events: &[Event]) -> Vec<&'static str> {
        events
            .iter()
            .map(|event| match event {
                Event::Order(order) => order.kind.name(),
                Event::Account(_) => "Account",
                Event::Time(_) => "Time",
            })
            .collect()
    }

    #[tokio::test]
    async fn test_simulate_market_buy() {
        let (client, mut rx) = client();
        client.update_price("BTCUSDT", dec!(50000));

        let order = Order::market(OrderId::new("O-1"), "BTCUSDT", OrderSide::Buy, dec!(0.1), 1);
        client.submit_order(&order, Uuid::new_v4()).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(
            kinds(&events),
            vec!["OrderSubmitted", "OrderAccepted", "OrderFilled", "Account"]
        );

        let Event::Order(filled) = &events[2] else {
            panic!("expected order event");
        };
        let fill = filled.fill().unwrap();
        assert_eq!(fill.price, dec!(50000));
        assert_eq!(fill.quantity, dec!(0.1));
        // 5000 notional at 0.1%
        assert_eq!(fill.commission, dec!(5));

        assert_eq!(client.cash(), dec!(100000) - dec!(5005));
        let Event::Account(account) = &events[3] else {
            panic!("expected account event");
        };
        assert_eq!(account.cash_balance, client.cash());
    }

    #[tokio::test]
    async fn test_simulate_limit_sell() {
        let (client, mut rx) = client();

        let order = Order::limit(
            OrderId::new("O-2"),
            "ETHUSDT",
            OrderSide::Sell,
            dec!(1.5),
            dec!(3000),
            1,
        );
        client.submit_order(&order, Uuid::new_v4()).await.unwrap();

        let events = drain(&mut rx);
        let Event::Order(filled) = &events[2] else {
            panic!("expected order event");
        };
        assert_eq!(filled.fill().unwrap().price, dec!(3000));
        assert_eq!(client.cash(), dec!(100000) + dec!(4500) - dec!(4.5));
    }

    #[tokio::test]
    async fn test_market_order_without_price_is_rejected() {
        let (client, mut rx) = client();

        let order = Order::market(OrderId::new("O-3"), "XRPUSDT", OrderSide::Buy, dec!(1), 1);
        client.submit_order(&order, Uuid::new_v4()).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(kinds(&events), vec!["OrderSubmitted", "OrderRejected"]);
        assert_eq!(client.cash(), dec!(100000));
    }

    #[tokio::test]
    async fn test_cancel_working_and_filled_orders() {
        let (client, mut rx) = client();

        let mut order = Order::limit(OrderId::new("O-4"), "BTCUSDT", OrderSide::Buy, dec!(1), dec!(1), 1);
        order.status = OrderStatus::Accepted;
        client.cancel_order(&order, "NONE").await.unwrap();

        order.status = OrderStatus::Filled;
        client.cancel_order(&order, "NONE").await.unwrap();

        assert_eq!(
            kinds(&drain(&mut rx)),
            vec!["OrderCancelled", "OrderCancelReject"]
        );
    }

    #[tokio::test]
    async fn test_modify_requires_working_order() {
        let (client, mut rx) = client();

        let mut order = Order::limit(OrderId::new("O-5"), "BTCUSDT", OrderSide::Buy, dec!(1), dec!(1), 1);
        order.status = OrderStatus::Accepted;
        client.modify_order(&order, dec!(2)).await.unwrap();

        order.status = OrderStatus::Cancelled;
        assert!(matches!(
            client.modify_order(&order, dec!(3)).await,
            Err(ExecutionError::Rejected(_))
        ));

        assert_eq!(kinds(&drain(&mut rx)), vec!["OrderModified"]);
    }

    #[tokio::test]
    async fn test_account_snapshot_and_inquiry() {
        let (client, mut rx) = client();

        let account = client.account();
        assert!(account.is_initialized());
        assert_eq!(account.account_id, "DRY-RUN");
        assert_eq!(account.cash_balance, dec!(100000));

        client.collateral_inquiry().await.unwrap();
        assert_eq!(kinds(&drain(&mut rx)), vec!["Account"]);
    }

    #[tokio::test]
    async fn test_closed_channel_errors() {
        let (client, rx) = client();
        drop(rx);

        assert!(matches!(
            client.collateral_inquiry().await,
            Err(ExecutionError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_unique_execution_ids() {
        let (client, mut rx) = client();
        client.update_price("BTCUSDT", dec!(100));

        for id in ["A", "B"] {
            let order = Order::market(OrderId::new(id), "BTCUSDT", OrderSide::Buy, dec!(1), 1);
            client.submit_order(&order, Uuid::new_v4()).await.unwrap();
        }

        let ids: Vec<String> = drain(&mut rx)
            .iter()
            .filter_map(|event| match event {
                Event::Order(order) => order.fill().map(|fill| fill.execution_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}

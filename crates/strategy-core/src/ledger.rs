//! Order and position ledger.
//!
//! The ledger records every order a strategy submits along with the position
//! it belongs to, and folds order events into both. It never talks to the
//! execution client itself; the context does that after recording.

use std::collections::HashMap;

use execution_core::{Order, OrderEvent, OrderId, Position, PositionId};
use tracing::{debug, info, warn};

use crate::error::{ensure_label, StrategyError};

/// Outcome of applying an order event.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerUpdate {
    /// Only the order changed.
    OrderUpdated,
    /// A fill opened a new position.
    PositionOpened(PositionId),
    /// A fill changed an existing open position.
    PositionUpdated(PositionId),
    /// A fill exited the position; it has been removed from the ledger.
    PositionClosed(Position),
    /// The event names an order the ledger has never seen.
    UnknownOrder(OrderId),
    /// A fill arrived for an order with no position association.
    UnmappedOrder(OrderId),
}

impl LedgerUpdate {
    /// Whether the event referenced state the ledger does not hold.
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Self::UnknownOrder(_) | Self::UnmappedOrder(_))
    }
}

/// Orders, their owning positions, and the active positions.
#[derive(Debug, Default)]
pub struct OrderLedger {
    orders: HashMap<OrderId, Order>,
    order_positions: HashMap<OrderId, PositionId>,
    positions: HashMap<PositionId, Position>,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new order bound to a position.
    ///
    /// Fails without touching the ledger if the order id is already present.
    pub fn record(&mut self, order: Order, position_id: PositionId) -> Result<(), StrategyError> {
        if self.orders.contains_key(&order.id) {
            return Err(StrategyError::DuplicateOrderId(order.id.to_string()));
        }
        ensure_label(position_id.as_str(), "position_id")?;

        debug!(order_id = %order.id, position_id = %position_id, "recorded order");
        self.order_positions.insert(order.id.clone(), position_id);
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    pub fn contains_order(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    pub fn order(&self, order_id: &OrderId) -> Result<&Order, StrategyError> {
        self.orders
            .get(order_id)
            .ok_or_else(|| StrategyError::OrderNotFound(order_id.to_string()))
    }

    pub fn orders(&self) -> &HashMap<OrderId, Order> {
        &self.orders
    }

    /// Orders that can still receive fills.
    pub fn active_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| o.status.is_active())
    }

    /// Position id the order was submitted for.
    pub fn position_id_for(&self, order_id: &OrderId) -> Option<&PositionId> {
        self.order_positions.get(order_id)
    }

    pub fn position(&self, position_id: &PositionId) -> Result<&Position, StrategyError> {
        self.positions
            .get(position_id)
            .ok_or_else(|| StrategyError::PositionNotFound(position_id.to_string()))
    }

    /// Active positions.
    pub fn positions(&self) -> &HashMap<PositionId, Position> {
        &self.positions
    }

    /// Fold an order event into the order and, for fills, its position.
    ///
    /// Missing orders or position associations are logged and reported, never
    /// raised.
    pub fn apply(&mut self, event: &OrderEvent) -> LedgerUpdate {
        let Some(order) = self.orders.get_mut(&event.order_id) else {
            warn!(
                order_id = %event.order_id,
                event = event.kind.name(),
                "order not found in the order book"
            );
            return LedgerUpdate::UnknownOrder(event.order_id.clone());
        };
        order.apply(event);

        if !event.is_fill() {
            return LedgerUpdate::OrderUpdated;
        }

        let Some(position_id) = self.order_positions.get(&event.order_id) else {
            warn!(
                order_id = %event.order_id,
                "order has no associated position id"
            );
            return LedgerUpdate::UnmappedOrder(event.order_id.clone());
        };

        let opened = !self.positions.contains_key(position_id);
        let position = self
            .positions
            .entry(position_id.clone())
            .or_insert_with(|| {
                Position::new(event.symbol.clone(), position_id.clone(), event.timestamp_ms)
            });
        position.apply(event);

        if position.is_exited() {
            let Some(closed) = self.positions.remove(position_id) else {
                return LedgerUpdate::OrderUpdated;
            };
            info!(
                position_id = %closed.id,
                realized_pnl = %closed.realized_pnl,
                "position closed"
            );
            return LedgerUpdate::PositionClosed(closed);
        }

        if opened {
            info!(position_id = %position_id, symbol = %event.symbol, "position opened");
            LedgerUpdate::PositionOpened(position_id.clone())
        } else {
            LedgerUpdate::PositionUpdated(position_id.clone())
        }
    }
}

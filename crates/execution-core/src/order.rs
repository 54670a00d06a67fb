//! Order types and status enums.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::events::{OrderEvent, OrderEventKind};
use crate::identifiers::OrderId;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that trades against this one.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    StopLimit,
}

impl OrderType {
    /// Whether the order carries a price of its own.
    pub fn is_priced(&self) -> bool {
        !matches!(self, Self::Market)
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created locally, not yet handed to the execution client.
    Initialized,
    /// Handed to the execution client, awaiting acknowledgment.
    Submitted,
    /// Acknowledged and working at the venue.
    Accepted,
    /// Order partially filled.
    PartiallyFilled,
    /// Order completely filled.
    Filled,
    /// Order cancelled.
    Cancelled,
    /// Order rejected by the venue.
    Rejected,
    /// Order expired.
    Expired,
}

impl OrderStatus {
    /// Check if this is a terminal status (order is done).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired
        )
    }

    /// Check if the order is still active/open.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Accepted | Self::PartiallyFilled
        )
    }
}

/// Time in force for priced orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good Till Cancelled.
    GTC,
    /// Immediate Or Cancel.
    IOC,
    /// Fill Or Kill.
    FOK,
    /// Good for the trading day.
    Day,
}

/// An order tracked by a strategy's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Strategy-generated order identifier.
    pub id: OrderId,
    /// Instrument symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit or stop price (None for market orders).
    pub price: Option<Decimal>,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Current order status.
    pub status: OrderStatus,
    /// Quantity filled so far.
    pub filled_qty: Decimal,
    /// Average fill price (None if no fills yet).
    pub avg_fill_price: Option<Decimal>,
    /// Timestamp when the order was created locally.
    pub created_at_ms: i64,
    /// Timestamp of the last applied event.
    pub updated_at_ms: i64,
}

impl Order {
    /// Create a new order in `Initialized` status.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
        price: Option<Decimal>,
        time_in_force: TimeInForce,
        created_at_ms: i64,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            price,
            time_in_force,
            status: OrderStatus::Initialized,
            filled_qty: Decimal::ZERO,
            avg_fill_price: None,
            created_at_ms,
            updated_at_ms: created_at_ms,
        }
    }

    /// Market order, day time-in-force.
    pub fn market(
        id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        created_at_ms: i64,
    ) -> Self {
        Self::new(
            id,
            symbol,
            side,
            OrderType::Market,
            quantity,
            None,
            TimeInForce::Day,
            created_at_ms,
        )
    }

    /// Limit order, good till cancelled.
    pub fn limit(
        id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        created_at_ms: i64,
    ) -> Self {
        Self::new(
            id,
            symbol,
            side,
            OrderType::Limit,
            quantity,
            Some(price),
            TimeInForce::GTC,
            created_at_ms,
        )
    }

    /// Calculate remaining quantity to be filled.
    pub fn remaining_qty(&self) -> Decimal {
        self.quantity - self.filled_qty
    }

    /// Check if the order is completely filled.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Apply an order event to this order's state.
    ///
    /// Events addressed to a different order id are ignored with a warning.
    pub fn apply(&mut self, event: &OrderEvent) {
        if event.order_id != self.id {
            warn!(
                order_id = %self.id,
                event_order_id = %event.order_id,
                "order event applied to the wrong order"
            );
            return;
        }

        self.updated_at_ms = event.timestamp_ms;

        match &event.kind {
            OrderEventKind::Submitted => self.status = OrderStatus::Submitted,
            OrderEventKind::Accepted => self.status = OrderStatus::Accepted,
            OrderEventKind::Rejected { .. } => self.status = OrderStatus::Rejected,
            OrderEventKind::Cancelled => self.status = OrderStatus::Cancelled,
            OrderEventKind::CancelRejected { .. } => {}
            OrderEventKind::Modified { price } => self.price = Some(*price),
            OrderEventKind::Expired => self.status = OrderStatus::Expired,
            OrderEventKind::PartiallyFilled(fill) | OrderEventKind::Filled(fill) => {
                let previous_notional =
                    self.avg_fill_price.unwrap_or(Decimal::ZERO) * self.filled_qty;
                self.filled_qty += fill.quantity;
                if self.filled_qty > Decimal::ZERO {
                    self.avg_fill_price =
                        Some((previous_notional + fill.price * fill.quantity) / self.filled_qty);
                }
                self.status = if matches!(event.kind, OrderEventKind::Filled(_)) {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
            }
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order({}, {} {} {} {:?}",
            self.id, self.symbol, self.side, self.quantity, self.order_type
        )?;
        if let Some(price) = self.price {
            write!(f, " @ {price}")?;
        }
        write!(f, ", {:?})", self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Fill;
    use rust_decimal_macros::dec;

    fn limit_order() -> Order {
        Order::limit(
            OrderId::new("O1"),
            "BTCUSDT",
            OrderSide::Buy,
            dec!(1.0),
            dec!(50000),
            1000,
        )
    }

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_order_status_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());

        assert!(!OrderStatus::Accepted.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
    }

    #[test]
    fn test_order_status_active() {
        assert!(OrderStatus::Accepted.is_active());
        assert!(OrderStatus::PartiallyFilled.is_active());
        assert!(OrderStatus::Submitted.is_active());

        assert!(!OrderStatus::Initialized.is_active());
        assert!(!OrderStatus::Filled.is_active());
        assert!(!OrderStatus::Cancelled.is_active());
    }

    #[test]
    fn test_order_remaining_qty() {
        let mut order = limit_order();
        assert_eq!(order.remaining_qty(), dec!(1.0));

        order.filled_qty = dec!(0.3);
        assert_eq!(order.remaining_qty(), dec!(0.7));
    }

    #[test]
    fn test_apply_lifecycle() {
        let mut order = limit_order();
        let id = order.id.clone();

        order.apply(&OrderEvent::new(id.clone(), "BTCUSDT", OrderEventKind::Submitted, 1001));
        assert_eq!(order.status, OrderStatus::Submitted);

        order.apply(&OrderEvent::new(id.clone(), "BTCUSDT", OrderEventKind::Accepted, 1002));
        assert_eq!(order.status, OrderStatus::Accepted);

        order.apply(&OrderEvent::new(
            id.clone(),
            "BTCUSDT",
            OrderEventKind::Modified { price: dec!(49000) },
            1003,
        ));
        assert_eq!(order.price, Some(dec!(49000)));

        let partial = Fill::new("E1", OrderSide::Buy, dec!(0.4), dec!(49000));
        order.apply(&OrderEvent::new(
            id.clone(),
            "BTCUSDT",
            OrderEventKind::PartiallyFilled(partial),
            1004,
        ));
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.filled_qty, dec!(0.4));

        let rest = Fill::new("E2", OrderSide::Buy, dec!(0.6), dec!(49500));
        order.apply(&OrderEvent::new(id, "BTCUSDT", OrderEventKind::Filled(rest), 1005));
        assert!(order.is_filled());
        assert_eq!(order.filled_qty, dec!(1.0));
        assert_eq!(order.avg_fill_price, Some(dec!(49300)));
        assert_eq!(order.updated_at_ms, 1005);
    }

    #[test]
    fn test_apply_ignores_foreign_event() {
        let mut order = limit_order();
        order.apply(&OrderEvent::new(
            OrderId::new("OTHER"),
            "BTCUSDT",
            OrderEventKind::Cancelled,
            2000,
        ));
        assert_eq!(order.status, OrderStatus::Initialized);
        assert_eq!(order.updated_at_ms, 1000);
    }
}

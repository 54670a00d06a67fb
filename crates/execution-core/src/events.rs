//! Execution events delivered to strategies.
//!
//! Events are immutable facts: they are built once by the execution client
//! (or a simulator) and only ever read afterwards.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifiers::OrderId;
use crate::order::OrderSide;

/// Details of a single execution against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Venue-assigned execution identifier.
    pub execution_id: String,
    /// Side of this execution.
    pub side: OrderSide,
    /// Quantity executed in this fill.
    pub quantity: Decimal,
    /// Price of this fill.
    pub price: Decimal,
    /// Commission charged for this fill.
    pub commission: Decimal,
}

impl Fill {
    pub fn new(
        execution_id: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            side,
            quantity,
            price,
            commission: Decimal::ZERO,
        }
    }

    pub fn with_commission(mut self, commission: Decimal) -> Self {
        self.commission = commission;
        self
    }

    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}

/// What happened to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEventKind {
    Submitted,
    Accepted,
    Rejected { reason: String },
    Cancelled,
    CancelRejected { reason: String },
    Modified { price: Decimal },
    Expired,
    PartiallyFilled(Fill),
    Filled(Fill),
}

impl OrderEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted => "OrderSubmitted",
            Self::Accepted => "OrderAccepted",
            Self::Rejected { .. } => "OrderRejected",
            Self::Cancelled => "OrderCancelled",
            Self::CancelRejected { .. } => "OrderCancelReject",
            Self::Modified { .. } => "OrderModified",
            Self::Expired => "OrderExpired",
            Self::PartiallyFilled(_) => "OrderPartiallyFilled",
            Self::Filled(_) => "OrderFilled",
        }
    }
}

/// An event concerning a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: Uuid,
    pub order_id: OrderId,
    pub symbol: String,
    pub kind: OrderEventKind,
    pub timestamp_ms: i64,
}

impl OrderEvent {
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        kind: OrderEventKind,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            order_id,
            symbol: symbol.into(),
            kind,
            timestamp_ms,
        }
    }

    /// The execution carried by a fill or partial-fill event.
    pub fn fill(&self) -> Option<&Fill> {
        match &self.kind {
            OrderEventKind::PartiallyFilled(fill) | OrderEventKind::Filled(fill) => Some(fill),
            _ => None,
        }
    }

    /// Check if this event moves a position.
    pub fn is_fill(&self) -> bool {
        self.fill().is_some()
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(order_id={}", self.kind.name(), self.order_id)?;
        match &self.kind {
            OrderEventKind::Rejected { reason } | OrderEventKind::CancelRejected { reason } => {
                write!(f, ", reason={reason}")?
            }
            OrderEventKind::Modified { price } => write!(f, ", price={price}")?,
            OrderEventKind::PartiallyFilled(fill) | OrderEventKind::Filled(fill) => write!(
                f,
                ", side={}, qty={}, price={}",
                fill.side, fill.quantity, fill.price
            )?,
            _ => {}
        }
        write!(f, ", id={})", self.event_id)
    }
}

/// A snapshot of account balances pushed by the execution client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEvent {
    pub event_id: Uuid,
    pub account_id: String,
    pub currency: String,
    pub cash_balance: Decimal,
    pub cash_start_day: Decimal,
    pub cash_activity_day: Decimal,
    pub margin_used_liquidation: Decimal,
    pub margin_used_maintenance: Decimal,
    pub margin_ratio: Decimal,
    pub margin_call_status: String,
    pub timestamp_ms: i64,
}

impl AccountEvent {
    /// A cash-only snapshot with no margin in use.
    pub fn cash(
        account_id: impl Into<String>,
        currency: impl Into<String>,
        cash_balance: Decimal,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            account_id: account_id.into(),
            currency: currency.into(),
            cash_balance,
            cash_start_day: cash_balance,
            cash_activity_day: Decimal::ZERO,
            margin_used_liquidation: Decimal::ZERO,
            margin_used_maintenance: Decimal::ZERO,
            margin_ratio: Decimal::ZERO,
            margin_call_status: "NONE".to_string(),
            timestamp_ms,
        }
    }
}

impl fmt::Display for AccountEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AccountEvent(account_id={}, cash_balance={} {}, margin_used={}, id={})",
            self.account_id,
            self.cash_balance,
            self.currency,
            self.margin_used_maintenance,
            self.event_id
        )
    }
}

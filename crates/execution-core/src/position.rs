//! Positions opened and closed by order fills.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::events::{Fill, OrderEvent};
use crate::identifiers::PositionId;
use crate::order::OrderSide;

/// Directional state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketPosition {
    Flat,
    Long,
    Short,
}

impl MarketPosition {
    /// The order side that flattens this exposure, `None` when already flat.
    pub fn flatten_side(&self) -> Option<OrderSide> {
        match self {
            Self::Long => Some(OrderSide::Sell),
            Self::Short => Some(OrderSide::Buy),
            Self::Flat => None,
        }
    }
}

/// A directional exposure in one instrument, identified by the strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Strategy-chosen identifier.
    pub id: PositionId,
    /// Instrument symbol.
    pub symbol: String,
    /// Creation time (from the opening fill event).
    pub opened_at_ms: i64,
    /// Time the position went flat after being entered.
    pub closed_at_ms: Option<i64>,
    /// Net quantity (positive = long, negative = short).
    pub quantity: Decimal,
    /// Volume-weighted average entry price.
    pub avg_entry_price: Decimal,
    /// Realized PnL from closed quantity.
    pub realized_pnl: Decimal,
    /// Total commission paid.
    pub total_commission: Decimal,
    /// Number of fills applied.
    pub fill_count: u32,
    /// Last update timestamp in milliseconds.
    pub last_update_ms: i64,
}

impl Position {
    /// Create a new flat position that has not been entered yet.
    pub fn new(symbol: impl Into<String>, id: PositionId, opened_at_ms: i64) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            opened_at_ms,
            closed_at_ms: None,
            quantity: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            fill_count: 0,
            last_update_ms: opened_at_ms,
        }
    }

    /// Check if position is flat (no holdings).
    pub fn is_flat(&self) -> bool {
        self.quantity == Decimal::ZERO
    }

    /// Check if position is long.
    pub fn is_long(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    /// Check if position is short.
    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    /// Whether any fill has been applied.
    pub fn is_entered(&self) -> bool {
        self.fill_count > 0
    }

    /// Entered at some point and flat again.
    pub fn is_exited(&self) -> bool {
        self.is_entered() && self.is_flat()
    }

    pub fn market_position(&self) -> MarketPosition {
        if self.is_long() {
            MarketPosition::Long
        } else if self.is_short() {
            MarketPosition::Short
        } else {
            MarketPosition::Flat
        }
    }

    /// Get absolute position size.
    pub fn abs_quantity(&self) -> Decimal {
        self.quantity.abs()
    }

    /// Calculate unrealized PnL at a given price.
    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        if self.is_flat() {
            Decimal::ZERO
        } else {
            (current_price - self.avg_entry_price) * self.quantity
        }
    }

    /// Apply an order event to this position.
    ///
    /// Only fill and partial-fill events change the position; anything else
    /// is ignored.
    pub fn apply(&mut self, event: &OrderEvent) {
        if let Some(fill) = event.fill() {
            self.apply_fill(fill, event.timestamp_ms);
        }
    }

    /// Apply a fill, updating quantity, average entry price and realized PnL.
    pub fn apply_fill(&mut self, fill: &Fill, timestamp_ms: i64) {
        if fill.quantity == Decimal::ZERO {
            return;
        }

        self.fill_count += 1;
        self.total_commission += fill.commission;
        self.last_update_ms = timestamp_ms;

        let qty_delta = match fill.side {
            OrderSide::Buy => fill.quantity,
            OrderSide::Sell => -fill.quantity,
        };

        let old_qty = self.quantity;
        let new_qty = old_qty + qty_delta;

        if old_qty == Decimal::ZERO {
            self.avg_entry_price = fill.price;
        } else if (old_qty > Decimal::ZERO) == (qty_delta > Decimal::ZERO) {
            // Adding to the existing exposure
            let old_cost = old_qty.abs() * self.avg_entry_price;
            let new_cost = fill.quantity * fill.price;
            let total_qty = old_qty.abs() + fill.quantity;
            self.avg_entry_price = (old_cost + new_cost) / total_qty;
        } else {
            let closed_qty = fill.quantity.min(old_qty.abs());

            if old_qty > Decimal::ZERO {
                self.realized_pnl += (fill.price - self.avg_entry_price) * closed_qty;
            } else {
                self.realized_pnl += (self.avg_entry_price - fill.price) * closed_qty;
            }

            // Reversal: the excess opens at the fill price
            if new_qty != Decimal::ZERO && new_qty.is_sign_positive() != old_qty.is_sign_positive()
            {
                self.avg_entry_price = fill.price;
            }
        }

        self.quantity = new_qty;

        if self.is_flat() {
            self.avg_entry_price = Decimal::ZERO;
            self.closed_at_ms = Some(timestamp_ms);
        } else {
            self.closed_at_ms = None;
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Position({}, {} {:?} {}",
            self.id,
            self.symbol,
            self.market_position(),
            self.abs_quantity()
        )?;
        if !self.is_flat() {
            write!(f, " @ {}", self.avg_entry_price)?;
        }
        write!(f, ", realized_pnl={})", self.realized_pnl)
    }
}

//! Trading account aggregate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::events::AccountEvent;

/// Balances of the account a strategy trades through.
///
/// Starts empty and is brought up to date by [`AccountEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub currency: String,
    pub cash_balance: Decimal,
    pub cash_start_day: Decimal,
    pub cash_activity_day: Decimal,
    pub margin_used_liquidation: Decimal,
    pub margin_used_maintenance: Decimal,
    pub margin_ratio: Decimal,
    pub margin_call_status: String,
    /// Number of account events applied.
    pub event_count: u64,
    pub last_updated_ms: Option<i64>,
}

impl Account {
    pub fn new(account_id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            currency: currency.into(),
            cash_balance: Decimal::ZERO,
            cash_start_day: Decimal::ZERO,
            cash_activity_day: Decimal::ZERO,
            margin_used_liquidation: Decimal::ZERO,
            margin_used_maintenance: Decimal::ZERO,
            margin_ratio: Decimal::ZERO,
            margin_call_status: String::new(),
            event_count: 0,
            last_updated_ms: None,
        }
    }

    /// Whether any event has been applied yet.
    pub fn is_initialized(&self) -> bool {
        self.event_count > 0
    }

    /// Cash not tied up as maintenance margin.
    pub fn free_equity(&self) -> Decimal {
        (self.cash_balance - self.margin_used_maintenance).max(Decimal::ZERO)
    }

    /// Overwrite balances with the snapshot carried by the event.
    ///
    /// Events for another account id are ignored with a warning.
    pub fn apply(&mut self, event: &AccountEvent) {
        if event.account_id != self.account_id {
            warn!(
                account_id = %self.account_id,
                event_account_id = %event.account_id,
                "account event for a different account"
            );
            return;
        }

        self.currency.clone_from(&event.currency);
        self.cash_balance = event.cash_balance;
        self.cash_start_day = event.cash_start_day;
        self.cash_activity_day = event.cash_activity_day;
        self.margin_used_liquidation = event.margin_used_liquidation;
        self.margin_used_maintenance = event.margin_used_maintenance;
        self.margin_ratio = event.margin_ratio;
        self.margin_call_status.clone_from(&event.margin_call_status);
        self.event_count += 1;
        self.last_updated_ms = Some(event.timestamp_ms);
    }
}

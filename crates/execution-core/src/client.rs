//! Execution client contract.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::account::Account;
use crate::error::ExecutionError;
use crate::order::Order;

/// Transport to a venue or broker.
///
/// Every call is fire-and-forget from the caller's perspective: a successful
/// return only means the request was sent. Outcomes arrive later as order
/// and account events.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Request a fresh account snapshot.
    async fn collateral_inquiry(&self) -> Result<(), ExecutionError>;

    /// Send a new order on behalf of the given strategy.
    async fn submit_order(&self, order: &Order, strategy_id: Uuid) -> Result<(), ExecutionError>;

    /// Request cancellation of a working order.
    async fn cancel_order(&self, order: &Order, reason: &str) -> Result<(), ExecutionError>;

    /// Request a price amendment of a working order.
    async fn modify_order(&self, order: &Order, new_price: Decimal) -> Result<(), ExecutionError>;

    /// The account this client trades through.
    fn account(&self) -> Account;
}

/// Shared execution client handle.
pub type SharedExecutionClient = Arc<dyn ExecutionClient>;

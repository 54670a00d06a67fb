//! Core execution types and collaborator contracts.
//!
//! This crate provides the execution-side building blocks a strategy works with:
//!
//! - **Orders**: `Order`, `OrderId`, `OrderIdGenerator`, `OrderSide`, `OrderType`, `OrderStatus`
//! - **Events**: `OrderEvent` (with `Fill`) and `AccountEvent`, immutable once created
//! - **Positions**: `Position` opened and closed by fills, `MarketPosition`
//! - **Account**: the `Account` aggregate updated from account events
//! - **Collaborators**: `ExecutionClient` (order transport) and `PositionStore` (closed positions)
//!
//! # Order Lifecycle
//!
//! 1. Strategy generates an `OrderId` and records the order in its ledger
//! 2. The order is handed to an `ExecutionClient`
//! 3. The client reports progress as `OrderEvent`s (submitted, accepted, fills, ...)
//! 4. Each event is applied to the order and, for fills, to the owning `Position`
//! 5. A position that goes flat is handed to the `PositionStore`

mod account;
mod client;
mod error;
mod events;
mod identifiers;
mod order;
mod position;
mod store;

pub use account::Account;
pub use client::{ExecutionClient, SharedExecutionClient};
pub use error::ExecutionError;
pub use events::{AccountEvent, Fill, OrderEvent, OrderEventKind};
pub use identifiers::{OrderId, OrderIdGenerator, PositionId};
pub use order::{Order, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use position::{MarketPosition, Position};
pub use store::{InMemoryPositionStore, PositionStore, SharedPositionStore};

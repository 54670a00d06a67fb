//! Events delivered through the dispatch funnel.

use std::fmt;

use execution_core::{AccountEvent, OrderEvent};
use uuid::Uuid;

/// A fired alert or timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEvent {
    /// Label given when the alert or timer was set.
    pub label: String,
    /// Fresh identifier for every firing.
    pub event_id: Uuid,
    /// Scheduled fire time in unix milliseconds.
    pub fire_time_ms: i64,
}

impl TimeEvent {
    pub fn new(label: impl Into<String>, fire_time_ms: i64) -> Self {
        Self {
            label: label.into(),
            event_id: Uuid::new_v4(),
            fire_time_ms,
        }
    }
}

impl fmt::Display for TimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimeEvent(label={}, fire_time_ms={}, id={})",
            self.label, self.fire_time_ms, self.event_id
        )
    }
}

/// Every kind of event a strategy receives in `on_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Order(OrderEvent),
    Account(AccountEvent),
    Time(TimeEvent),
}

impl Event {
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            Self::Order(event) => event.timestamp_ms,
            Self::Account(event) => event.timestamp_ms,
            Self::Time(event) => event.fire_time_ms,
        }
    }

    pub fn event_id(&self) -> Uuid {
        match self {
            Self::Order(event) => event.event_id,
            Self::Account(event) => event.event_id,
            Self::Time(event) => event.event_id,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order(event) => event.fmt(f),
            Self::Account(event) => event.fmt(f),
            Self::Time(event) => event.fmt(f),
        }
    }
}

impl From<OrderEvent> for Event {
    fn from(event: OrderEvent) -> Self {
        Self::Order(event)
    }
}

impl From<AccountEvent> for Event {
    fn from(event: AccountEvent) -> Self {
        Self::Account(event)
    }
}

impl From<TimeEvent> for Event {
    fn from(event: TimeEvent) -> Self {
        Self::Time(event)
    }
}

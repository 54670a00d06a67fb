//! Storage of closed positions.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::position::Position;

/// Receives positions once they are closed.
///
/// Implementations must not block the caller; failures are theirs to log.
pub trait PositionStore: Send + Sync {
    fn save(&self, position: Position);
}

/// Keeps closed positions in memory.
#[derive(Debug, Default)]
pub struct InMemoryPositionStore {
    positions: Mutex<Vec<Position>>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored position, oldest first.
    pub fn positions(&self) -> Vec<Position> {
        self.positions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.positions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.lock().is_empty()
    }
}

impl PositionStore for InMemoryPositionStore {
    fn save(&self, position: Position) {
        debug!(position_id = %position.id, "storing closed position");
        self.positions.lock().push(position);
    }
}

/// Shared position store handle.
pub type SharedPositionStore = Arc<dyn PositionStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::PositionId;

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryPositionStore::new();
        assert!(store.is_empty());

        store.save(Position::new("BTCUSDT", PositionId::new("P1"), 1));
        store.save(Position::new("BTCUSDT", PositionId::new("P2"), 2));

        assert_eq!(store.len(), 2);
        assert_eq!(store.positions()[1].id, PositionId::new("P2"));
    }
}

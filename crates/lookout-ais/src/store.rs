//! Concurrent store of latest-known vessel positions.

use dashmap::DashMap;
use lookout_core::VesselId;

use crate::record::ShipRecord;

/// Volatile cache of the newest [`ShipRecord`] per vessel.
///
/// Written only by the ingester. Each entry is replaced atomically, so a
/// reader never observes a half-written record. Entries are never evicted;
/// consumers judge freshness from `last_update`.
#[derive(Debug, Default)]
pub struct PositionStore {
    ships: DashMap<VesselId, ShipRecord>,
}

impl PositionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for its vessel, returning the previous one.
    pub fn upsert(&self, record: ShipRecord) -> Option<ShipRecord> {
        self.ships.insert(record.id.clone(), record)
    }

    /// Snapshot of one vessel's record.
    pub fn get(&self, id: &str) -> Option<ShipRecord> {
        self.ships.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every record, ordered by vessel ID.
    pub fn all(&self) -> Vec<ShipRecord> {
        let mut ships: Vec<ShipRecord> = self
            .ships
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        ships.sort_by(|a, b| a.id.cmp(&b.id));
        ships
    }

    /// Number of vessels tracked.
    pub fn len(&self) -> usize {
        self.ships.len()
    }

    /// Whether no vessel has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }
}

use crate::error::{Result, VectorStoreError};
use crate::types::{SlotId, VectorRecord};
use std::collections::BTreeMap;

/// Slot id -> provenance table. Callers serialize access.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: BTreeMap<SlotId, VectorRecord>,
}

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, slot: SlotId, record: VectorRecord) -> Result<()> {
        if self.records.contains_key(&slot) {
            return Err(VectorStoreError::DuplicateSlot(slot));
        }
        self.records.insert(slot, record);
        Ok(())
    }

    pub fn get(&self, slot: SlotId) -> Result<&VectorRecord> {
        self.records
            .get(&slot)
            .ok_or(VectorStoreError::NotFound(slot))
    }

    /// Every `(slot, record)` pair, ascending by slot.
    pub fn all(&self) -> impl Iterator<Item = (SlotId, &VectorRecord)> {
        self.records.iter().map(|(slot, record)| (*slot, record))
    }

    #[must_use]
    pub fn max_slot(&self) -> Option<SlotId> {
        self.records.keys().next_back().copied()
    }

    /// Drops every record at or after `slot`. Used to undo a partial insert.
    pub fn truncate_from(&mut self, slot: SlotId) {
        let _ = self.records.split_off(&slot);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(SlotId, VectorRecord)> for RecordStore {
    fn from_iter<T: IntoIterator<Item = (SlotId, VectorRecord)>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

use super::{HistoryRecord, HistoryStore};
use crate::error::StoreError;

/// Process-local history; lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    pub(super) records: Vec<HistoryRecord>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&mut self, record: HistoryRecord) -> Result<(), StoreError> {
        self.records.push(record);
        Ok(())
    }

    fn records(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self.records.clone())
    }
}

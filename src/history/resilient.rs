use super::{HistoryRecord, HistoryStore, JsonHistoryStore, MemoryHistoryStore};
use crate::error::StoreError;
use crate::policy::{Policy, PolicySchema};
use std::sync::Arc;
use tracing::warn;

/// File-backed history that degrades to memory instead of failing.
///
/// The first [`StoreError`] switches the store to an in-memory log for the
/// rest of the process. The file is not retried; the in-memory log starts
/// empty, so the current policy becomes the schema default until new
/// records are appended.
#[derive(Debug)]
pub struct ResilientHistory {
    file: Option<JsonHistoryStore>,
    memory: MemoryHistoryStore,
}

impl ResilientHistory {
    pub fn new(file: JsonHistoryStore) -> Self {
        Self {
            file: Some(file),
            memory: MemoryHistoryStore::new(),
        }
    }

    /// Memory-only history, for `--no-history` style runs and tests.
    pub fn in_memory() -> Self {
        Self {
            file: None,
            memory: MemoryHistoryStore::new(),
        }
    }

    /// True once the store has given up on the file.
    pub fn is_degraded(&self) -> bool {
        self.file.is_none()
    }

    fn degrade(&mut self, err: &StoreError) {
        warn!(error = %err, "history store unavailable; continuing with in-memory history");
        self.file = None;
    }

    /// Never fails; see the type docs for the degraded behaviour.
    pub fn append_record(&mut self, record: HistoryRecord) {
        if let Some(file) = self.file.as_mut() {
            match file.append(record.clone()) {
                Ok(()) => return,
                Err(err) => self.degrade(&err),
            }
        }
        self.memory.records.push(record);
    }

    pub fn all_records(&mut self) -> Vec<HistoryRecord> {
        if let Some(file) = &self.file {
            match file.records() {
                Ok(records) => return records,
                Err(err) => self.degrade(&err),
            }
        }
        self.memory.records.clone()
    }

    pub fn current_policy(&mut self, schema: &Arc<PolicySchema>) -> Policy {
        super::latest_from(&self.all_records(), schema)
    }
}

impl HistoryStore for ResilientHistory {
    fn append(&mut self, record: HistoryRecord) -> Result<(), StoreError> {
        self.append_record(record);
        Ok(())
    }

    fn records(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        match &self.file {
            Some(file) => file.records().or_else(|err| {
                warn!(error = %err, "history read failed; serving in-memory records");
                Ok(self.memory.records.clone())
            }),
            None => Ok(self.memory.records.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyDelta, PolicyEngine, response_schema};
    use std::fs;
    use tempfile::TempDir;

    fn record() -> HistoryRecord {
        let before = response_schema().default_policy();
        let delta = PolicyDelta::new().with("verbosity", "short");
        let after = PolicyEngine::apply(&before, &delta);
        HistoryRecord::new("too long", &before, &after, &delta)
    }

    #[test]
    fn healthy_file_is_used() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        let mut history = ResilientHistory::new(JsonHistoryStore::new(&path));
        history.append_record(record());

        assert!(!history.is_degraded());
        assert!(path.exists());
        let policy = history.current_policy(&response_schema());
        assert_eq!(policy.get("verbosity"), Some("short"));
    }

    #[test]
    fn corrupt_file_degrades_to_default_policy() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        fs::write(&path, "garbage").unwrap();

        let mut history = ResilientHistory::new(JsonHistoryStore::new(&path));
        let schema = response_schema();
        assert_eq!(history.current_policy(&schema), schema.default_policy());
        assert!(history.is_degraded());
    }

    #[test]
    fn failed_append_keeps_record_in_memory() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let mut history = ResilientHistory::new(JsonHistoryStore::new(blocker.join("h.json")));
        history.append_record(record());

        assert!(history.is_degraded());
        assert_eq!(history.all_records().len(), 1);
        let policy = history.current_policy(&response_schema());
        assert_eq!(policy.get("verbosity"), Some("short"));
    }

    #[test]
    fn trait_append_never_fails() {
        let mut history = ResilientHistory::in_memory();
        assert!(HistoryStore::append(&mut history, record()).is_ok());
        assert_eq!(history.records().unwrap().len(), 1);
    }
}

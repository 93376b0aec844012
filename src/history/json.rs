use super::{HistoryRecord, HistoryStore};
use crate::error::StoreError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// History kept as one JSON array in a file.
///
/// Every append rewrites the whole file through a uniquely named temp file
/// and a rename, so a crash or a competing writer leaves either the old or
/// the new array on disk, never a torn one. Concurrent writers are
/// last-writer-wins.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, message: impl std::fmt::Display) -> StoreError {
        StoreError::unavailable(&self.path, message.to_string())
    }
}

impl HistoryStore for JsonHistoryStore {
    fn append(&mut self, record: HistoryRecord) -> Result<(), StoreError> {
        let mut records = self.records()?;
        records.push(record);
        let content = serde_json::to_string_pretty(&records).map_err(|e| self.unavailable(e))?;
        write_atomic(&self.path, &content).map_err(|e| self.unavailable(format!("{e:#}")))?;
        debug!(path = %self.path.display(), records = records.len(), "history appended");
        Ok(())
    }

    fn records(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.unavailable(e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| self.unavailable(format!("corrupt history: {e}")))
    }
}

fn write_atomic(path: &Path, content: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed creating history dir: {}", parent.display()))?;

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed creating temp file in {}", parent.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("failed writing temp file: {}", temp.path().display()))?;
    temp.persist(path)
        .with_context(|| format!("failed replacing history file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyDelta, PolicyEngine, response_schema};
    use tempfile::TempDir;

    fn record(feedback: &str, delta: &PolicyDelta) -> HistoryRecord {
        let before = response_schema().default_policy();
        let after = PolicyEngine::apply(&before, delta);
        HistoryRecord::new(feedback, &before, &after, delta)
    }

    #[test]
    fn missing_file_is_empty_history() {
        let tmp = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(tmp.path().join("history.json"));
        assert!(store.records().unwrap().is_empty());
        let schema = response_schema();
        assert_eq!(store.latest_policy(&schema).unwrap(), schema.default_policy());
    }

    #[test]
    fn latest_policy_after_append_equals_policy_after() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonHistoryStore::new(tmp.path().join("nested/dir/history.json"));
        let delta = PolicyDelta::new().with("tone", "formal").with("structure", "steps");
        let rec = record("be formal, in steps", &delta);
        let expected = rec.policy_after.clone();

        store.append(rec).unwrap();
        let latest = store.latest_policy(&response_schema()).unwrap();
        assert_eq!(latest.values(), &expected);
    }

    #[test]
    fn file_is_a_pretty_json_array_without_temp_leftovers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        let mut store = JsonHistoryStore::new(&path);
        store.append(record("a", &PolicyDelta::new())).unwrap();
        store
            .append(record("b", &PolicyDelta::new().with("verbosity", "short")))
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[1]["feedback"], "b");
        assert_eq!(parsed[1]["applied_delta"]["verbosity"], "short");
        let entries: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("history.json")]);
    }

    #[test]
    fn concurrent_writers_never_fail() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut store = JsonHistoryStore::new(path);
                    for i in 0..25 {
                        store
                            .append(record(&format!("{worker}-{i}"), &PolicyDelta::new()))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = JsonHistoryStore::new(&path).records().unwrap();
        assert!(!records.is_empty());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn corrupt_file_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonHistoryStore::new(&path);
        let err = store.records().unwrap_err();
        assert!(err.to_string().contains("corrupt history"));
    }

    #[test]
    fn invalid_stored_values_fall_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        fs::write(
            &path,
            r#"[{"timestamp":"2025-01-05T10:00:00Z","feedback":"x",
                "policy_before":{},"policy_after":{"verbosity":"short","tone":"sarcastic","mood":"x"},
                "applied_delta":{}}]"#,
        )
        .unwrap();
        let policy = JsonHistoryStore::new(&path)
            .latest_policy(&response_schema())
            .unwrap();
        assert_eq!(policy.get("verbosity"), Some("short"));
        assert_eq!(policy.get("tone"), Some("neutral"));
        assert_eq!(policy.get("mood"), None);
    }

    #[test]
    fn unwritable_location_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "file, not dir").unwrap();
        let mut store = JsonHistoryStore::new(blocker.join("history.json"));
        let err = store.append(record("a", &PolicyDelta::new())).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }
}

//! Append-only log of policy changes.
//!
//! The current policy is the `policy_after` of the last record, or the
//! schema default when the log is empty.

pub mod json;
pub mod memory;
pub mod resilient;

pub use json::JsonHistoryStore;
pub use memory::MemoryHistoryStore;
pub use resilient::ResilientHistory;

use crate::error::StoreError;
use crate::feedback::Reward;
use crate::policy::{Policy, PolicyDelta, PolicySchema, PolicyValues};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One applied change. Readers ignore fields they do not know, so new
/// optional fields can be added without breaking old files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub feedback: String,
    pub policy_before: PolicyValues,
    pub policy_after: PolicyValues,
    pub applied_delta: PolicyDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

impl HistoryRecord {
    pub fn new(feedback: &str, before: &Policy, after: &Policy, delta: &PolicyDelta) -> Self {
        Self {
            timestamp: Utc::now(),
            feedback: feedback.to_string(),
            policy_before: before.values().clone(),
            policy_after: after.values().clone(),
            applied_delta: delta.clone(),
            schema: Some(after.schema().name.clone()),
            reward: None,
        }
    }

    #[must_use]
    pub fn with_reward(mut self, reward: Option<Reward>) -> Self {
        self.reward = reward;
        self
    }

    /// Records written before the `schema` field existed match any schema.
    pub fn belongs_to(&self, schema: &str) -> bool {
        self.schema.as_deref().is_none_or(|s| s == schema)
    }
}

pub trait HistoryStore: Send {
    fn append(&mut self, record: HistoryRecord) -> Result<(), StoreError>;

    /// All records, oldest first.
    fn records(&self) -> Result<Vec<HistoryRecord>, StoreError>;

    fn latest_policy(&self, schema: &Arc<PolicySchema>) -> Result<Policy, StoreError> {
        let records = self.records()?;
        Ok(latest_from(&records, schema))
    }
}

/// Rehydrate the newest matching record's `policy_after`, or the default.
pub fn latest_from(records: &[HistoryRecord], schema: &Arc<PolicySchema>) -> Policy {
    records
        .iter()
        .rev()
        .find(|r| r.belongs_to(&schema.name))
        .map_or_else(
            || schema.default_policy(),
            |r| schema.policy_from_values(&r.policy_after),
        )
}

//! Generic, schema-driven behaviour policies.
//!
//! A [`PolicySchema`] names a closed set of fields and the values each may
//! hold; a [`Policy`] is one assignment of values to those fields. Every use
//! case (response style, reward-driven style, routing) is an instance of the
//! same types, see [`presets`].

pub mod engine;
pub mod presets;
pub mod schema;

pub use engine::PolicyEngine;
pub use presets::{reward_schema, response_schema, routing_schema, schema_by_name};
pub use schema::{FieldSpec, PolicySchema, ValueSpec};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Plain `field → value` map, the persisted form of a policy.
pub type PolicyValues = BTreeMap<String, String>;

/// Immutable assignment of values to a schema's fields.
///
/// Only the engine produces new policies from old ones; nothing mutates a
/// policy in place.
#[derive(Debug, Clone)]
pub struct Policy {
    schema: Arc<PolicySchema>,
    values: PolicyValues,
}

impl Policy {
    pub(crate) fn from_parts(schema: Arc<PolicySchema>, values: PolicyValues) -> Self {
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<PolicySchema> {
        &self.schema
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn values(&self) -> &PolicyValues {
        &self.values
    }

    /// `verbosity=medium, tone=neutral` in schema field order.
    pub fn summary(&self) -> String {
        self.schema
            .fields
            .iter()
            .map(|f| format!("{}={}", f.name, self.get(&f.name).unwrap_or("-")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PartialEq for Policy {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.values == other.values
    }
}

impl Eq for Policy {}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Policy({})", self.summary())
    }
}

impl Serialize for Policy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// Partial update to a policy: candidate values keyed by field name.
///
/// May carry keys the schema does not know; the engine ignores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDelta(BTreeMap<String, String>);

impl PolicyDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: &str) {
        self.0.insert(field.to_string(), value.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl FromIterator<(String, String)> for PolicyDelta {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for PolicyDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

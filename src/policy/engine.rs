use super::{Policy, PolicyDelta, PolicyValues};
use crate::error::PolicyError;
use tracing::debug;

/// Merges deltas into policies and checks results against the schema.
pub struct PolicyEngine;

impl PolicyEngine {
    /// Overwrite every schema field named in `delta`; keys outside the schema
    /// are ignored. The result is always complete but may hold values outside
    /// an enumeration; run [`PolicyEngine::validate`] before adopting it.
    pub fn apply(policy: &Policy, delta: &PolicyDelta) -> Policy {
        let schema = policy.schema();

        for (key, _) in delta.iter().filter(|(key, _)| !schema.contains(key)) {
            debug!(schema = %schema.name, field = key, "ignoring delta key outside schema");
        }

        let values: PolicyValues = schema
            .fields
            .iter()
            .map(|field| {
                let value = delta
                    .get(&field.name)
                    .or_else(|| policy.get(&field.name))
                    .unwrap_or(field.default.as_str());
                (field.name.clone(), value.to_string())
            })
            .collect();

        Policy::from_parts(std::sync::Arc::clone(schema), values)
    }

    /// True iff every field holds a member of its enumeration.
    pub fn validate(policy: &Policy) -> bool {
        Self::first_violation(policy).is_none()
    }

    /// The first field (in schema order) whose value is not allowed.
    pub fn first_violation(policy: &Policy) -> Option<PolicyError> {
        policy.schema().fields.iter().find_map(|field| {
            let value = policy.get(&field.name).unwrap_or_default();
            (!field.allows(value)).then(|| PolicyError::ValidationFailed {
                field: field.name.clone(),
                value: value.to_string(),
            })
        })
    }

    /// Apply and validate in one step. On failure the caller keeps the old
    /// policy; nothing is partially applied.
    pub fn try_apply(policy: &Policy, delta: &PolicyDelta) -> Result<Policy, PolicyError> {
        let candidate = Self::apply(policy, delta);
        match Self::first_violation(&candidate) {
            Some(err) => Err(err),
            None => Ok(candidate),
        }
    }
}

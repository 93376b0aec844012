use super::{Policy, PolicyValues};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// One allowed value of a policy field together with the prompt clause it
/// maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub name: String,
    pub clause: String,
}

/// A named behavioural dimension with a closed, ordered enumeration.
///
/// Values are listed in ascending order: `Increase` steps towards the end of
/// the list, `Decrease` towards the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Heading used by the prompt builder (e.g. `LENGTH/DEPTH`).
    pub label: String,
    pub values: Vec<ValueSpec>,
    pub default: String,
}

impl FieldSpec {
    pub fn new(name: &str, label: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            values: Vec::new(),
            default: default.to_string(),
        }
    }

    /// Append an allowed value (builder style, ascending order).
    pub fn value(mut self, name: &str, clause: &str) -> Self {
        self.values.push(ValueSpec {
            name: name.to_string(),
            clause: clause.to_string(),
        });
        self
    }

    pub fn allows(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.name == value)
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v.name == value)
    }

    pub fn allowed_values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.name.as_str())
    }

    /// Clause for `value`, or the default value's clause when `value` is
    /// missing or outside the enumeration.
    pub fn clause_for(&self, value: Option<&str>) -> &str {
        value
            .and_then(|v| self.values.iter().find(|spec| spec.name == v))
            .or_else(|| self.values.iter().find(|spec| spec.name == self.default))
            .map_or("", |spec| spec.clause.as_str())
    }

    /// Move `steps` positions along the enumeration from `from`, clamped to
    /// the ends. An unknown `from` is treated as the default value.
    pub fn step(&self, from: &str, steps: isize) -> &str {
        let Some(last) = self.values.len().checked_sub(1) else {
            return &self.default;
        };
        let start = self
            .position(from)
            .or_else(|| self.position(&self.default))
            .unwrap_or(0);
        let target = start.saturating_add_signed(steps).min(last);
        &self.values[target].name
    }
}

/// Closed description of a policy: which fields exist and which values each
/// may hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl PolicySchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Check that every field's default is part of its own enumeration and
    /// that field names are unique.
    pub fn is_well_formed(&self) -> bool {
        let unique = self
            .fields
            .iter()
            .enumerate()
            .all(|(i, f)| self.fields[..i].iter().all(|g| g.name != f.name));
        unique && self.fields.iter().all(|f| f.allows(&f.default))
    }

    /// Policy holding every field's default.
    pub fn default_policy(self: &Arc<Self>) -> Policy {
        let values = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.default.clone()))
            .collect();
        Policy::from_parts(Arc::clone(self), values)
    }

    /// Rehydrate a stored policy. Unknown keys are dropped; missing or
    /// out-of-enumeration values fall back to the field default.
    pub fn policy_from_values(self: &Arc<Self>, stored: &PolicyValues) -> Policy {
        let values = self
            .fields
            .iter()
            .map(|f| {
                let value = match stored.get(&f.name) {
                    Some(v) if f.allows(v) => v.clone(),
                    Some(v) => {
                        warn!(
                            schema = %self.name,
                            field = %f.name,
                            value = %v,
                            "stored policy value outside enumeration; using default"
                        );
                        f.default.clone()
                    }
                    None => f.default.clone(),
                };
                (f.name.clone(), value)
            })
            .collect();
        Policy::from_parts(Arc::clone(self), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verbosity() -> FieldSpec {
        FieldSpec::new("verbosity", "LENGTH", "medium")
            .value("short", "Be brief.")
            .value("medium", "Be balanced.")
            .value("long", "Be thorough.")
    }

    fn schema() -> Arc<PolicySchema> {
        Arc::new(
            PolicySchema::new("test").field(verbosity()).field(
                FieldSpec::new("tone", "TONE", "neutral")
                    .value("neutral", "Be neutral.")
                    .value("formal", "Be formal."),
            ),
        )
    }

    #[test]
    fn clause_falls_back_to_default() {
        let field = verbosity();
        assert_eq!(field.clause_for(Some("short")), "Be brief.");
        assert_eq!(field.clause_for(Some("gigantic")), "Be balanced.");
        assert_eq!(field.clause_for(None), "Be balanced.");
    }

    #[test]
    fn step_clamps_at_both_ends() {
        let field = verbosity();
        assert_eq!(field.step("medium", 1), "long");
        assert_eq!(field.step("long", 1), "long");
        assert_eq!(field.step("medium", -1), "short");
        assert_eq!(field.step("short", -3), "short");
        assert_eq!(field.step("unknown", 1), "long");
    }

    #[test]
    fn default_policy_holds_defaults() {
        let policy = schema().default_policy();
        assert_eq!(policy.get("verbosity"), Some("medium"));
        assert_eq!(policy.get("tone"), Some("neutral"));
    }

    #[test]
    fn rehydration_drops_unknown_and_repairs_invalid() {
        let mut stored = PolicyValues::new();
        stored.insert("verbosity".into(), "short".into());
        stored.insert("tone".into(), "sarcastic".into());
        stored.insert("mood".into(), "happy".into());

        let policy = schema().policy_from_values(&stored);
        assert_eq!(policy.get("verbosity"), Some("short"));
        assert_eq!(policy.get("tone"), Some("neutral"));
        assert_eq!(policy.get("mood"), None);
    }

    #[test]
    fn well_formed_detects_bad_default() {
        let bad = PolicySchema::new("bad")
            .field(FieldSpec::new("tone", "TONE", "loud").value("quiet", "Shh."));
        assert!(!bad.is_well_formed());
        assert!(schema().is_well_formed());
    }
}

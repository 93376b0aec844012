use super::{Adjustment, Assessment, InterpreterMode};
use crate::policy::{Policy, PolicyDelta};
use tracing::debug;

/// Turn an assessment into concrete field values for `policy`.
///
/// Directions step one position along the field's ordered values and clamp
/// at the ends. Adjustments that would leave a field unchanged are dropped,
/// as are fields outside the schema, so an empty delta means "no change".
/// `Set` values are passed through unvalidated; validation is the engine's
/// job. In reward mode nothing is learned unless the reward is negative.
pub fn resolve(assessment: &Assessment, policy: &Policy, mode: InterpreterMode) -> PolicyDelta {
    if mode == InterpreterMode::Reward && !assessment.reward.is_some_and(|r| r.is_negative()) {
        return PolicyDelta::new();
    }

    let schema = policy.schema();
    let mut delta = PolicyDelta::new();

    for (name, adjustment) in &assessment.adjustments {
        let Some(field) = schema.get(name) else {
            debug!(schema = %schema.name, field = %name, "dropping adjustment outside schema");
            continue;
        };
        let current = policy.get(name).unwrap_or(field.default.as_str());

        let target = match adjustment {
            Adjustment::NoChange => continue,
            Adjustment::Increase => field.step(current, 1),
            Adjustment::Decrease => field.step(current, -1),
            Adjustment::Set(value) => value.as_str(),
        };

        if target != current {
            delta.insert(name, target);
        }
    }

    delta
}

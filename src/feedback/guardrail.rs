use super::{Adjustment, Assessment, Reward};
use crate::policy::PolicySchema;
use tracing::info;

/// What a guardrail does to the field it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailEffect {
    Increase,
    Decrease,
    /// Set the first candidate the schema allows; skipped if none is.
    SetFirstOf(Vec<String>),
}

/// Where in the feedback a marker may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerMatch {
    /// Anywhere in the lower-cased text.
    Substring,
    /// Only at a word start, so `unfriendly` does not trigger `friendly`.
    WordStart,
}

/// Deterministic keyword rule that overrides the model's classification.
///
/// Overrides are unconditional: whatever the model said for `field` is
/// replaced. A rule without a reward of its own still turns a non-negative
/// reward negative, so a style request is learned in reward mode too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guardrail {
    pub marker: String,
    pub field: String,
    pub effect: GuardrailEffect,
    pub reward: Option<Reward>,
    pub matching: MarkerMatch,
}

impl Guardrail {
    pub fn new(marker: &str, field: &str, effect: GuardrailEffect) -> Self {
        Self {
            marker: marker.to_lowercase(),
            field: field.to_string(),
            effect,
            reward: None,
            matching: MarkerMatch::WordStart,
        }
    }

    #[must_use]
    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = Some(reward);
        self
    }

    /// Match the marker anywhere, even inside a word.
    #[must_use]
    pub fn anywhere(mut self) -> Self {
        self.matching = MarkerMatch::Substring;
        self
    }

    pub fn matches(&self, feedback_lower: &str) -> bool {
        if self.marker.is_empty() {
            return false;
        }
        match self.matching {
            MarkerMatch::Substring => feedback_lower.contains(&self.marker),
            MarkerMatch::WordStart => contains_at_word_start(feedback_lower, &self.marker),
        }
    }

    /// The adjustment this rule produces for `schema`, or `None` when the
    /// schema lacks the field or every candidate value.
    fn adjustment_for(&self, schema: &PolicySchema) -> Option<Adjustment> {
        let field = schema.get(&self.field)?;
        match &self.effect {
            GuardrailEffect::Increase => Some(Adjustment::Increase),
            GuardrailEffect::Decrease => Some(Adjustment::Decrease),
            GuardrailEffect::SetFirstOf(candidates) => candidates
                .iter()
                .find(|c| field.allows(c))
                .map(|c| Adjustment::Set(c.clone())),
        }
    }
}

fn contains_at_word_start(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Built-in rules, applied in order; a later rule touching the same field
/// wins, so `too short` comes after `too long`.
pub fn default_guardrails() -> Vec<Guardrail> {
    vec![
        Guardrail::new("too long", "verbosity", GuardrailEffect::Decrease)
            .with_reward(Reward::Negative)
            .anywhere(),
        Guardrail::new("too short", "verbosity", GuardrailEffect::Increase)
            .with_reward(Reward::Negative)
            .anywhere(),
        Guardrail::new(
            "bullet",
            "structure",
            GuardrailEffect::SetFirstOf(vec!["bulleted".into()]),
        ),
        Guardrail::new(
            "friendly",
            "tone",
            GuardrailEffect::SetFirstOf(vec!["friendly".into(), "casual".into()]),
        ),
        Guardrail::new(
            "professional",
            "tone",
            GuardrailEffect::SetFirstOf(vec!["formal".into()]),
        ),
    ]
}

/// Run every rule against `feedback`, overriding `assessment` in place.
///
/// Rewards are only touched on assessments that carry one (reward mode),
/// except for rules with an explicit reward.
pub fn apply_guardrails(
    rules: &[Guardrail],
    feedback: &str,
    schema: &PolicySchema,
    assessment: &mut Assessment,
) {
    let lowered = feedback.to_lowercase();
    for rule in rules.iter().filter(|r| r.matches(&lowered)) {
        let Some(adjustment) = rule.adjustment_for(schema) else {
            continue;
        };
        info!(
            marker = %rule.marker,
            field = %rule.field,
            adjustment = %adjustment,
            "guardrail override"
        );
        assessment.adjustments.insert(rule.field.clone(), adjustment);
        match rule.reward {
            Some(reward) => assessment.reward = Some(reward),
            None if assessment.reward.is_some_and(|r| !r.is_negative()) => {
                assessment.reward = Some(Reward::Negative);
            }
            None => {}
        }
        assessment.guardrails.push(rule.marker.clone());
    }
}

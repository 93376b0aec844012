use crate::feedback::Reward;
use crate::policy::{Policy, PolicyValues};
use serde::Serialize;
use strum::Display;

/// Position within one adaptation cycle.
///
/// `Idle → Responded → DeltaEvaluated → PolicyUpdated → Responded → Idle`;
/// `PolicyUpdated` is skipped when the delta is empty or invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    Idle,
    Responded,
    DeltaEvaluated,
    PolicyUpdated,
}

impl CycleState {
    /// Whether `next` may follow `self`.
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Responded, Self::Responded)
                | (Self::Responded, Self::DeltaEvaluated | Self::Idle)
                | (Self::DeltaEvaluated, Self::PolicyUpdated | Self::Responded)
                | (Self::PolicyUpdated, Self::Responded)
        )
    }
}

/// What the agent remembers between reward-mode cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LearningState {
    pub step: u64,
    /// Policy that produced the judged response.
    pub last_action: Option<PolicyValues>,
    pub last_reward: Option<Reward>,
}

impl LearningState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: &Policy, reward: Option<Reward>) {
        self.step += 1;
        self.last_action = Some(action.values().clone());
        self.last_reward = reward;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::reward_schema;

    #[test]
    fn documented_transitions_are_allowed() {
        use CycleState::*;
        let path = [Idle, Responded, DeltaEvaluated, PolicyUpdated, Responded, Idle];
        assert!(path.windows(2).all(|w| w[0].can_advance_to(w[1])));
        assert!(DeltaEvaluated.can_advance_to(Responded));
        assert!(!Idle.can_advance_to(PolicyUpdated));
        assert!(!PolicyUpdated.can_advance_to(Idle));
    }

    #[test]
    fn state_displays_screaming_case() {
        assert_eq!(CycleState::DeltaEvaluated.to_string(), "DELTA_EVALUATED");
    }

    #[test]
    fn learning_state_counts_steps() {
        let mut state = LearningState::new();
        let policy = reward_schema().default_policy();
        state.record(&policy, Some(Reward::Negative));
        state.record(&policy, Some(Reward::Positive));
        assert_eq!(state.step, 2);
        assert_eq!(state.last_reward, Some(Reward::Positive));
        assert_eq!(state.last_action.as_ref(), Some(policy.values()));
    }
}

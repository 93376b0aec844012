//! The feedback-to-policy loop: answer, judge feedback, update, answer again.

pub mod state;

pub use state::{CycleState, LearningState};

use crate::error::PolicyError;
use crate::feedback::{Assessment, FeedbackInterpreter, InterpreterMode, resolve};
use crate::generator::{Generation, Generator};
use crate::history::{HistoryRecord, HistoryStore, ResilientHistory};
use crate::policy::{Policy, PolicyDelta, PolicyEngine, PolicySchema};
use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything one adaptation cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub task: String,
    pub feedback: String,
    /// Answer the feedback was about.
    pub first: Generation,
    pub assessment: Assessment,
    pub delta: PolicyDelta,
    pub policy_before: Policy,
    pub policy_after: Policy,
    /// Set when the delta named a value outside a field's enumeration.
    pub rejected: Option<PolicyError>,
    /// Answer regenerated under `policy_after`.
    pub second: Generation,
    pub states: Vec<CycleState>,
}

impl CycleReport {
    pub fn policy_changed(&self) -> bool {
        self.policy_before != self.policy_after
    }
}

/// Outcome of judging one piece of feedback against a policy.
#[derive(Debug, Clone)]
pub struct PolicyUpdate {
    pub assessment: Assessment,
    pub delta: PolicyDelta,
    /// The new policy when `applied`, otherwise the input policy.
    pub policy: Policy,
    pub applied: bool,
    pub rejected: Option<PolicyError>,
}

/// Interpret `feedback`, merge the resulting delta and record the change.
///
/// Empty deltas and rejected deltas leave `policy` in effect and write
/// nothing. A failed history append is logged; the update still applies.
pub async fn learn_from_feedback<H: HistoryStore + ?Sized>(
    interpreter: &FeedbackInterpreter,
    history: &mut H,
    policy: &Policy,
    feedback: &str,
) -> PolicyUpdate {
    let assessment = interpreter.interpret(feedback, policy).await;
    let delta = resolve(&assessment, policy, interpreter.mode());
    let mut update = PolicyUpdate {
        assessment,
        delta,
        policy: policy.clone(),
        applied: false,
        rejected: None,
    };

    if update.delta.is_empty() {
        debug!(feedback, "empty delta; policy unchanged");
        return update;
    }

    match PolicyEngine::try_apply(policy, &update.delta) {
        Ok(updated) => {
            let record = HistoryRecord::new(feedback, policy, &updated, &update.delta)
                .with_reward(update.assessment.reward);
            if let Err(err) = history.append(record) {
                warn!(error = %err, "failed to persist policy change; keeping it in memory");
            }
            info!(
                schema = %policy.schema().name,
                delta = %update.delta,
                policy = %updated,
                "policy updated"
            );
            update.policy = updated;
            update.applied = true;
        }
        Err(err) => {
            warn!(delta = %update.delta, error = %err, "policy update rejected");
            update.rejected = Some(err);
        }
    }
    update
}

struct PendingTask {
    task: String,
    generation: Generation,
}

/// Drives one interactive user through repeated adaptation cycles.
pub struct AdaptationLoop<H: HistoryStore = ResilientHistory> {
    generator: Generator,
    interpreter: FeedbackInterpreter,
    history: H,
    policy: Policy,
    state: CycleState,
    learning: LearningState,
    pending: Option<PendingTask>,
}

impl<H: HistoryStore> AdaptationLoop<H> {
    /// Resume from the latest recorded policy for `schema`.
    pub fn new(
        generator: Generator,
        interpreter: FeedbackInterpreter,
        history: H,
        schema: &Arc<PolicySchema>,
    ) -> Self {
        let policy = history.latest_policy(schema).unwrap_or_else(|err| {
            warn!(error = %err, "could not read policy history; starting from defaults");
            schema.default_policy()
        });
        debug!(schema = %schema.name, policy = %policy, "adaptation loop ready");
        Self {
            generator,
            interpreter,
            history,
            policy,
            state: CycleState::Idle,
            learning: LearningState::new(),
            pending: None,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn learning(&self) -> &LearningState {
        &self.learning
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn mode(&self) -> InterpreterMode {
        self.interpreter.mode()
    }

    /// Answer `task` under the current policy and wait for feedback on it.
    pub async fn respond(&mut self, task: &str) -> Generation {
        let generation = self.generator.respond(&self.policy, task).await;
        self.pending = Some(PendingTask {
            task: task.to_string(),
            generation: generation.clone(),
        });
        self.state = CycleState::Responded;
        generation
    }

    /// Judge `feedback` on the last answer, update the policy and answer again.
    ///
    /// Fails only when there is no answer awaiting feedback. A rejected
    /// delta leaves the policy untouched and is reported in the result.
    pub async fn adapt(&mut self, feedback: &str) -> Result<CycleReport> {
        let Some(pending) = self.pending.take() else {
            bail!("no response is awaiting feedback; call respond first");
        };
        let mut states = vec![CycleState::Responded];

        let policy_before = self.policy.clone();
        let update =
            learn_from_feedback(&self.interpreter, &mut self.history, &policy_before, feedback)
                .await;
        self.advance(CycleState::DeltaEvaluated, &mut states);

        if self.interpreter.mode() == InterpreterMode::Reward {
            self.learning.record(&policy_before, update.assessment.reward);
        }
        if update.applied {
            self.policy = update.policy.clone();
            self.advance(CycleState::PolicyUpdated, &mut states);
        }

        let second = self.generator.respond(&self.policy, &pending.task).await;
        self.advance(CycleState::Responded, &mut states);
        self.advance(CycleState::Idle, &mut states);

        Ok(CycleReport {
            task: pending.task,
            feedback: feedback.to_string(),
            first: pending.generation,
            assessment: update.assessment,
            delta: update.delta,
            policy_before,
            policy_after: self.policy.clone(),
            rejected: update.rejected,
            second,
            states,
        })
    }

    /// `respond` followed by `adapt`, for callers that already hold the
    /// feedback text.
    pub async fn run_cycle(&mut self, task: &str, feedback: &str) -> Result<CycleReport> {
        self.state = CycleState::Idle;
        self.respond(task).await;
        self.adapt(feedback).await
    }

    fn advance(&mut self, next: CycleState, states: &mut Vec<CycleState>) {
        debug_assert!(self.state.can_advance_to(next), "{} -> {next}", self.state);
        self.state = next;
        states.push(next);
    }
}

use super::guardrail::{Guardrail, apply_guardrails, default_guardrails};
use super::parse::parse_reply;
use super::{Assessment, InterpreterMode};
use crate::error::{AgentError, PromptError};
use crate::policy::Policy;
use crate::prompt::{
    TeraEngine, build_delta_evaluator_prompt, build_reward_evaluator_prompt, default_engine,
};
use crate::providers::LanguageModel;
use tracing::{debug, warn};

/// Classifies free-text feedback with a deterministic model.
///
/// Never fails: model and parse errors yield [`Assessment::fallback`], and
/// the guardrails run afterwards in every case.
pub struct FeedbackInterpreter {
    model: LanguageModel,
    mode: InterpreterMode,
    templates: TeraEngine,
    guardrails: Vec<Guardrail>,
}

impl FeedbackInterpreter {
    pub fn new(model: LanguageModel, mode: InterpreterMode) -> Result<Self, PromptError> {
        Ok(Self {
            model,
            mode,
            templates: default_engine()?,
            guardrails: default_guardrails(),
        })
    }

    /// Replace the built-in keyword rules.
    #[must_use]
    pub fn with_guardrails(mut self, guardrails: Vec<Guardrail>) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn mode(&self) -> InterpreterMode {
        self.mode
    }

    pub async fn interpret(&self, feedback: &str, policy: &Policy) -> Assessment {
        let mut assessment = match self.classify(feedback, policy).await {
            Ok(assessment) => assessment,
            Err(err) => {
                warn!(
                    mode = %self.mode,
                    error = %err,
                    "feedback classification failed; using fallback"
                );
                Assessment::fallback(self.mode)
            }
        };

        apply_guardrails(&self.guardrails, feedback, policy.schema(), &mut assessment);
        debug!(
            mode = %self.mode,
            source = %assessment.source,
            adjustments = assessment.adjustments.len(),
            "feedback interpreted"
        );
        assessment
    }

    async fn classify(&self, feedback: &str, policy: &Policy) -> Result<Assessment, AgentError> {
        let instruction = match self.mode {
            InterpreterMode::Delta => build_delta_evaluator_prompt(&self.templates, policy)?,
            InterpreterMode::Reward => build_reward_evaluator_prompt(&self.templates, policy)?,
        };

        let reply = self.model.generate(&instruction, feedback).await?;
        let assessment = parse_reply(self.mode, &reply).inspect_err(|_| {
            debug!(reply = %reply, "unparseable evaluator reply");
        })?;
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{Adjustment, AssessmentSource, Reward};
    use crate::policy::{response_schema, reward_schema};
    use crate::providers::{Determinism, Provider};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Canned {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn chat_with_system(
            &self,
            system_prompt: Option<&str>,
            _message: &str,
            _model: &str,
            _temperature: f64,
        ) -> anyhow::Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push(system_prompt.unwrap_or_default().to_string());
            self.reply
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("transport error"))
        }
    }

    fn interpreter(
        reply: Option<&'static str>,
        mode: InterpreterMode,
    ) -> (FeedbackInterpreter, Arc<Canned>) {
        let provider = Arc::new(Canned {
            reply,
            prompts: Mutex::new(Vec::new()),
        });
        let model = LanguageModel::new(provider.clone(), "judge", Determinism::Deterministic);
        (FeedbackInterpreter::new(model, mode).unwrap(), provider)
    }

    #[tokio::test]
    async fn model_delta_is_used_when_valid() {
        let (interp, provider) = interpreter(Some(r#"{"tone": "formal"}"#), InterpreterMode::Delta);
        let policy = response_schema().default_policy();
        let a = interp.interpret("Be more formal please", &policy).await;

        assert_eq!(a.source, AssessmentSource::Model);
        assert_eq!(a.adjustment("tone"), Some(&Adjustment::Set("formal".into())));
        assert!(provider.prompts.lock().unwrap()[0].contains("Policy Adaptation Judge"));
    }

    #[tokio::test]
    async fn fenced_reply_falls_back() {
        let (interp, _) = interpreter(
            Some("```json\n{\"tone\": \"formal\"}\n```"),
            InterpreterMode::Delta,
        );
        let a = interp
            .interpret("Be more formal please", &response_schema().default_policy())
            .await;
        assert_eq!(a.source, AssessmentSource::Fallback);
        assert!(a.adjustments.is_empty());
    }

    #[tokio::test]
    async fn transport_error_falls_back_then_guardrail_fires() {
        let (interp, _) = interpreter(None, InterpreterMode::Reward);
        let a = interp
            .interpret("Way too short.", &reward_schema().default_policy())
            .await;
        assert_eq!(a.source, AssessmentSource::Fallback);
        assert_eq!(a.reward, Some(Reward::Negative));
        assert_eq!(a.adjustment("verbosity"), Some(&Adjustment::Increase));
    }

    #[tokio::test]
    async fn guardrail_overrides_contrary_model_output() {
        let (interp, _) = interpreter(
            Some(r#"{"reward": 1, "dimensions": {"verbosity": "decrease", "tone": "no_change"}}"#),
            InterpreterMode::Reward,
        );
        let a = interp
            .interpret("too short", &reward_schema().default_policy())
            .await;
        assert_eq!(a.source, AssessmentSource::Model);
        assert_eq!(a.reward, Some(Reward::Negative));
        assert_eq!(a.adjustment("verbosity"), Some(&Adjustment::Increase));
        assert_eq!(a.adjustment("tone"), Some(&Adjustment::NoChange));
    }

    #[tokio::test]
    async fn custom_guardrails_replace_defaults() {
        let (interp, _) = interpreter(None, InterpreterMode::Reward);
        let interp = interp.with_guardrails(Vec::new());
        let a = interp
            .interpret("too short", &reward_schema().default_policy())
            .await;
        assert_eq!(a.reward, Some(Reward::Neutral));
        assert!(a.adjustments.is_empty());
    }
}

use super::traits::{ChatMessage, Provider};
use crate::error::ModelError;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sampling profile for a model call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Determinism {
    /// User-facing answers.
    Creative(f64),
    /// Classification and routing; same input, same output.
    Deterministic,
}

impl Determinism {
    pub const DEFAULT_CREATIVE: Self = Self::Creative(0.7);

    pub fn temperature(self) -> f64 {
        match self {
            Self::Creative(t) => t,
            Self::Deterministic => 0.0,
        }
    }
}

/// A provider bound to a model name and sampling profile.
///
/// Every failure at this boundary surfaces as [`ModelError::Unavailable`];
/// callers decide how to degrade.
#[derive(Clone)]
pub struct LanguageModel {
    provider: Arc<dyn Provider>,
    model: String,
    determinism: Determinism,
}

impl LanguageModel {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        determinism: Determinism,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            determinism,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn determinism(&self) -> Determinism {
        self.determinism
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One instruction plus one user turn.
    pub async fn generate(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let started = Instant::now();
        let result = self
            .provider
            .chat_with_system(
                Some(system),
                user,
                &self.model,
                self.determinism.temperature(),
            )
            .await;
        self.finish(result, started)
    }

    /// Instruction plus a multi-turn history ending with the user's turn.
    pub async fn generate_with_history(
        &self,
        system: &str,
        history: &[ChatMessage],
    ) -> Result<String, ModelError> {
        let started = Instant::now();
        let result = self
            .provider
            .chat_with_history(
                Some(system),
                history,
                &self.model,
                self.determinism.temperature(),
            )
            .await;
        self.finish(result, started)
    }

    fn finish(
        &self,
        result: anyhow::Result<String>,
        started: Instant,
    ) -> Result<String, ModelError> {
        let elapsed_ms = started.elapsed().as_millis();
        match result {
            Ok(text) => {
                debug!(
                    provider = self.provider.name(),
                    model = %self.model,
                    elapsed_ms,
                    chars = text.len(),
                    "model call succeeded"
                );
                Ok(text)
            }
            Err(err) => {
                debug!(
                    provider = self.provider.name(),
                    model = %self.model,
                    elapsed_ms,
                    error = %err,
                    "model call failed"
                );
                Err(ModelError::unavailable(
                    self.provider.name(),
                    format!("{err:#}"),
                ))
            }
        }
    }
}

impl std::fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModel")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("determinism", &self.determinism)
            .finish()
    }
}

//! Builds the model handles every command needs from the loaded config.

use crate::config::Config;
use crate::history::{JsonHistoryStore, ResilientHistory};
use crate::providers::{Determinism, LanguageModel, Provider, ProviderOptions, create_provider};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

/// One model handle per role. Generation and chat share a provider;
/// evaluator and router share a second one that may run in JSON mode.
#[derive(Debug, Clone)]
pub struct Models {
    pub generator: LanguageModel,
    pub evaluator: LanguageModel,
    pub router: LanguageModel,
    pub chat: LanguageModel,
}

fn provider(config: &Config, json_mode: bool) -> Result<Arc<dyn Provider>> {
    let options = ProviderOptions {
        base_url: config.provider.base_url.clone(),
        timeout_secs: config.provider.timeout_secs,
        json_mode,
    };
    let provider = create_provider(
        &config.provider.name,
        config.provider.api_key.as_deref(),
        &options,
    )
    .with_context(|| format!("failed to create provider `{}`", config.provider.name))?;
    Ok(Arc::from(provider))
}

pub fn build_models(config: &Config) -> Result<Models> {
    let free_text = provider(config, false)?;
    let structured = if config.provider.json_mode {
        provider(config, true)?
    } else {
        Arc::clone(&free_text)
    };

    debug!(
        provider = %config.provider.name,
        model = %config.models.model,
        evaluator = %config.evaluator_model(),
        router = %config.routing_model(),
        json_mode = config.provider.json_mode,
        "models configured"
    );

    Ok(Models {
        generator: LanguageModel::new(
            Arc::clone(&free_text),
            config.models.model.clone(),
            Determinism::Creative(config.models.temperature),
        ),
        evaluator: LanguageModel::new(
            Arc::clone(&structured),
            config.evaluator_model(),
            Determinism::Deterministic,
        ),
        router: LanguageModel::new(structured, config.routing_model(), Determinism::Deterministic),
        chat: LanguageModel::new(
            free_text,
            config.models.model.clone(),
            Determinism::Creative(config.models.chat_temperature),
        ),
    })
}

/// History file from config, degrading to memory if it becomes unusable.
pub fn open_history(config: &Config) -> ResilientHistory {
    ResilientHistory::new(JsonHistoryStore::new(config.history_path()))
}

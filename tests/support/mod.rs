#![allow(dead_code)]

use adaptive_agent::providers::{Determinism, LanguageModel, Provider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Creative calls echo the instruction back; deterministic calls (the
/// evaluator and router) pop the next scripted reply.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    seen_instructions: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            seen_instructions: Mutex::new(Vec::new()),
        })
    }

    pub fn seen_instructions(&self) -> Vec<String> {
        self.seen_instructions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        _message: &str,
        _model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let system = system_prompt.unwrap_or_default().to_string();
        self.seen_instructions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(system.clone());

        if temperature > 0.0 {
            return Ok(system);
        }
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }
}

/// Always fails, like an unreachable server.
#[derive(Debug)]
pub struct DownProvider;

#[async_trait]
impl Provider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    async fn chat_with_system(
        &self,
        _system_prompt: Option<&str>,
        _message: &str,
        _model: &str,
        _temperature: f64,
    ) -> anyhow::Result<String> {
        anyhow::bail!("connection refused")
    }
}

pub fn creative(provider: Arc<dyn Provider>) -> LanguageModel {
    LanguageModel::new(provider, "test-model", Determinism::DEFAULT_CREATIVE)
}

pub fn deterministic(provider: Arc<dyn Provider>) -> LanguageModel {
    LanguageModel::new(provider, "test-model", Determinism::Deterministic)
}

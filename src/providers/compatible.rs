//! Generic OpenAI-compatible provider.
//! OpenAI, OpenRouter, Groq and most hosted gateways accept the same
//! `/chat/completions` request, so one implementation covers all of them.

use super::http_client::build_provider_client_with_timeout;
use super::scrub::sanitize_api_error;
use super::traits::{ChatMessage, ChatRole, Provider};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct OpenAiCompatibleProvider {
    pub(crate) name: String,
    pub(crate) base_url: String,
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: Option<String>,
    /// Pre-computed chat completions URL.
    cached_chat_url: String,
    /// Ask the server for a bare JSON object (`response_format`).
    json_mode: bool,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>, timeout_secs: u64) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let cached_chat_url = if base_url.ends_with("chat/completions") {
            base_url.clone()
        } else {
            format!("{base_url}/chat/completions")
        };

        Self {
            name: name.to_string(),
            base_url,
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            cached_chat_url,
            json_mode: false,
            client: build_provider_client_with_timeout(timeout_secs),
        }
    }

    /// Request `response_format: {"type": "json_object"}` on every call.
    #[must_use]
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    fn chat_completions_url(&self) -> &str {
        &self.cached_chat_url
    }

    fn build_request<'a>(
        &self,
        system_prompt: Option<&'a str>,
        history: &'a [ChatMessage],
        model: &'a str,
        temperature: f64,
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(sys) = system_prompt {
            messages.push(Message {
                role: ChatRole::System.as_str(),
                content: sys,
            });
        }
        messages.extend(history.iter().map(|m| Message {
            role: m.role.as_str(),
            content: &m.content,
        }));

        ChatRequest {
            model,
            messages,
            temperature,
            response_format: self.json_mode.then_some(ResponseFormat {
                r#type: "json_object",
            }),
        }
    }

    async fn call_chat_completions(&self, request: &ChatRequest<'_>) -> anyhow::Result<String> {
        let Some(auth) = &self.cached_auth_header else {
            anyhow::bail!(
                "{} API key not set. Set ADAPTIVE_AGENT_API_KEY or `api_key` in config.toml.",
                self.name
            );
        };

        let response = self
            .client
            .post(self.chat_completions_url())
            .header("Authorization", auth)
            .json(request)
            .send()
            .await
            .with_context(|| format!("{} chat completions request failed", self.name))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} API error ({status}): {}", self.name, sanitize_api_error(&body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("{} chat completions JSON decode failed", self.name))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("No response from {}", self.name))
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let history = [ChatMessage::user(message)];
        let request = self.build_request(system_prompt, &history, model, temperature);
        self.call_chat_completions(&request).await
    }

    async fn chat_with_history(
        &self,
        system_prompt: Option<&str>,
        history: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let request = self.build_request(system_prompt, history, model, temperature);
        self.call_chat_completions(&request).await
    }

    async fn warmup(&self) -> anyhow::Result<()> {
        // Any response, even 404, means TLS and DNS are done.
        self.client
            .get(&self.base_url)
            .send()
            .await
            .with_context(|| format!("{} warmup failed", self.name))?;
        Ok(())
    }
}

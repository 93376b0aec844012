use super::http_client::build_provider_client_with_timeout;
use super::traits::{ChatMessage, ChatRole, Provider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    base_url: String,
    json_mode: bool,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    options: Options,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaProvider {
    pub fn new(base_url: Option<&str>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            json_mode: false,
            client: build_provider_client_with_timeout(timeout_secs),
        }
    }

    /// Ask Ollama to constrain output to JSON (`"format": "json"`).
    #[must_use]
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
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
            stream: false,
            options: Options { temperature },
            format: self.json_mode.then_some("json"),
        }
    }

    async fn call_api(&self, request: &ChatRequest<'_>) -> anyhow::Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let err = super::api_error("Ollama", response).await;
            anyhow::bail!("{err}. Is Ollama running? (ollama serve)");
        }

        let chat: ChatResponse = response.json().await.map_err(anyhow::Error::msg)?;
        Ok(chat.message.content)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
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
        self.call_api(&request).await
    }

    async fn chat_with_history(
        &self,
        system_prompt: Option<&str>,
        history: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let request = self.build_request(system_prompt, history, model, temperature);
        self.call_api(&request).await
    }
}

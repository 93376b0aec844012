use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of model-facing conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Flatten a history into one prompt for providers without multi-turn
/// support. Messages are prefixed with their role label.
pub fn messages_to_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .filter(|msg| !msg.content.trim().is_empty())
        .map(|msg| {
            let label = match msg.role {
                ChatRole::User => "User:",
                ChatRole::Assistant => "Assistant:",
                ChatRole::System => "System:",
            };
            format!("{label} {}", msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    async fn chat(&self, message: &str, model: &str, temperature: f64) -> anyhow::Result<String> {
        self.chat_with_system(None, message, model, temperature)
            .await
    }

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String>;

    /// Multi-turn chat. Default: flattens the history into a single user
    /// message.
    async fn chat_with_history(
        &self,
        system_prompt: Option<&str>,
        history: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let text = messages_to_text(history);
        self.chat_with_system(system_prompt, &text, model, temperature)
            .await
    }

    /// Warm up the HTTP connection pool. No-op by default.
    async fn warmup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

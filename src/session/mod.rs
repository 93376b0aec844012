//! Persona chat sessions.

pub mod persona;
pub mod store;

pub use persona::{DEFAULT_INSTRUCTION, Persona, instruction_for};
pub use store::{DEFAULT_HISTORY_WINDOW, DEFAULT_PASSAGES, SessionStore};

use crate::providers::{ChatMessage, ChatRole};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One line of the user-facing transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: ChatRole,
    pub content: String,
    /// The reply came from the fallback path and was not shown to the model.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl TranscriptEntry {
    pub fn user(content: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: content.to_string(),
            fallback: false,
        }
    }

    pub fn assistant(content: &str, fallback: bool) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.to_string(),
            fallback,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    /// What the user sees, fallback replies included.
    pub transcript: Vec<TranscriptEntry>,
    /// What the model sees on later turns.
    pub messages: Vec<ChatMessage>,
    pub persona: Option<Persona>,
    /// Set by the first message; the persona cannot change afterwards.
    pub persona_locked: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            transcript: Vec::new(),
            messages: Vec::new(),
            persona: None,
            persona_locked: false,
            created_at: Utc::now(),
        }
    }
}

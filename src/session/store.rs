use super::persona::{Persona, instruction_for};
use super::{Session, TranscriptEntry};
use crate::error::{PromptError, SessionError};
use crate::generator::{FALLBACK_MARKER, Generation};
use crate::prompt::{TeraEngine, build_persona_prompt, default_engine};
use crate::providers::{ChatMessage, LanguageModel};
use crate::retrieval::Retriever;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model-facing messages sent with each turn, besides the new user turn.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;
pub const DEFAULT_PASSAGES: usize = 3;

/// Every chat session of one process, keyed by generated id.
///
/// Handlers receive the store explicitly; nothing here is global.
pub struct SessionStore {
    model: LanguageModel,
    templates: TeraEngine,
    retriever: Option<(Arc<dyn Retriever>, usize)>,
    history_window: usize,
    sessions: Vec<Session>,
}

impl SessionStore {
    pub fn new(model: LanguageModel) -> Result<Self, PromptError> {
        Ok(Self {
            model,
            templates: default_engine()?,
            retriever: None,
            history_window: DEFAULT_HISTORY_WINDOW,
            sessions: Vec::new(),
        })
    }

    /// Ground replies in the top `k` passages for each user message.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>, k: usize) -> Self {
        self.retriever = Some((retriever, k));
        self
    }

    #[must_use]
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Create a session and return its id. Unnamed sessions are numbered
    /// `Session 1`, `Session 2`, ...
    pub fn create(&mut self, name: Option<&str>) -> String {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("Session {}", self.sessions.len() + 1), str::to_string);
        let session = Session::new(name);
        let id = session.id.clone();
        debug!(session_id = %id, name = %session.name, "session created");
        self.sessions.push(session);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Sessions in creation order.
    pub fn list(&self) -> &[Session] {
        &self.sessions
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Session, SessionError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Choose the persona before the first message. Re-selecting the locked
    /// persona is a no-op; anything else fails once the session is locked.
    pub fn select_persona(&mut self, id: &str, persona: Persona) -> Result<(), SessionError> {
        let session = self.get_mut(id)?;
        if session.persona_locked {
            if session.persona == Some(persona) {
                return Ok(());
            }
            return Err(SessionError::PersonaLocked {
                session_id: session.id.clone(),
                locked: session
                    .persona
                    .map_or_else(|| "default".to_string(), |p| p.to_string()),
            });
        }
        session.persona = Some(persona);
        Ok(())
    }

    /// Answer one user message in a session. Locks the persona. Model
    /// failures produce a fallback reply instead of an error.
    pub async fn send(&mut self, id: &str, input: &str) -> Result<Generation, SessionError> {
        let passages = match &self.retriever {
            Some((retriever, k)) => retriever.retrieve(input, *k).await.unwrap_or_else(|err| {
                warn!(error = %err, "retrieval failed; answering without passages");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let window = self.history_window;
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        if !session.persona_locked {
            session.persona_locked = true;
            info!(
                session_id = %session.id,
                persona = %session.persona.map_or_else(|| "default".to_string(), |p| p.to_string()),
                "persona locked"
            );
        }
        session.transcript.push(TranscriptEntry::user(input));

        let start = session.messages.len().saturating_sub(window);
        let mut context: Vec<ChatMessage> = session.messages[start..].to_vec();
        context.push(ChatMessage::user(input));
        session.messages.push(ChatMessage::user(input));

        let persona = session.persona;
        let system = build_persona_prompt(&self.templates, instruction_for(persona), &passages);
        let reply = match system {
            Ok(system) => self
                .model
                .generate_with_history(&system, &context)
                .await
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };

        let generation = match reply {
            Ok(text) => {
                session.messages.push(ChatMessage::assistant(text.clone()));
                Generation {
                    text,
                    fell_back: false,
                }
            }
            Err(note) => {
                warn!(
                    session_id = %session.id,
                    error = %note,
                    "chat turn failed; returning fallback"
                );
                Generation {
                    text: fallback_reply(persona, &note),
                    fell_back: true,
                }
            }
        };
        session
            .transcript
            .push(TranscriptEntry::assistant(&generation.text, generation.fell_back));
        Ok(generation)
    }
}

fn fallback_reply(persona: Option<Persona>, note: &str) -> String {
    let persona = persona.map_or_else(|| "default".to_string(), |p| p.to_string());
    format!(
        "{FALLBACK_MARKER}\nPersona={persona}\n\nThe language model is unavailable ({note}). Please try again."
    )
}

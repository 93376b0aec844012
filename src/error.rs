use std::path::PathBuf;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `adaptive-agent`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; CLI and config glue continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum AgentError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Model / Provider ────────────────────────────────────────────────
    #[error("model: {0}")]
    Model(#[from] ModelError),

    // ── Policy ──────────────────────────────────────────────────────────
    #[error("policy: {0}")]
    Policy(#[from] PolicyError),

    // ── History store ───────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Session ─────────────────────────────────────────────────────────
    #[error("session: {0}")]
    Session(#[from] SessionError),

    // ── Prompt / Template ───────────────────────────────────────────────
    #[error("prompt: {0}")]
    Prompt(#[from] PromptError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Model errors ────────────────────────────────────────────────────────────

/// Failures at the hosted-model boundary.
///
/// Both kinds are recovered locally by the generator and the feedback
/// interpreter; they never abort an interaction.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport, authentication, rate-limit or non-success HTTP status.
    #[error("provider {provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },

    /// The reply could not be parsed into the caller's expected shape.
    #[error("invalid model response: {message}")]
    ResponseInvalid { message: String },
}

impl ModelError {
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn response_invalid(message: impl Into<String>) -> Self {
        Self::ResponseInvalid {
            message: message.into(),
        }
    }
}

// ─── Policy errors ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A delta would leave `field` holding a value outside its enumeration.
    #[error("value {value:?} is not allowed for field {field}")]
    ValidationFailed { field: String, value: String },

    #[error("unknown policy schema: {0}")]
    UnknownSchema(String),
}

// ─── History store errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    /// History file unreadable, unparseable or unwritable.
    #[error("history store {} unavailable: {message}", path.display())]
    Unavailable { path: PathBuf, message: String },
}

impl StoreError {
    pub fn unavailable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ─── Session errors ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("persona already locked to {locked} for session {session_id}")]
    PersonaLocked { session_id: String, locked: String },
}

// ─── Prompt / Template errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template render failed: {0}")]
    Render(String),

    #[error("template not found: {0}")]
    NotFound(String),
}

// ─── Convenience re-exports ──────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = AgentError::Config(ConfigError::Validation("bad temp".into()));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn model_unavailable_names_provider() {
        let err = AgentError::from(ModelError::unavailable("openai", "connection refused"));
        assert!(err.to_string().contains("openai"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn policy_validation_names_field_and_value() {
        let err = PolicyError::ValidationFailed {
            field: "verbosity".into(),
            value: "enormous".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("verbosity"));
        assert!(rendered.contains("enormous"));
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let agent_err: AgentError = anyhow_err.into();
        assert!(agent_err.to_string().contains("something went wrong"));
    }

    #[test]
    fn store_error_includes_path() {
        let err = StoreError::unavailable("/tmp/history.json", "permission denied");
        assert!(err.to_string().contains("/tmp/history.json"));
    }
}

use crate::policy::Policy;
use crate::prompt::build_policy_prompt;
use crate::providers::LanguageModel;
use tracing::warn;

pub const FALLBACK_MARKER: &str = "[FALLBACK RESPONSE]";

/// A displayable answer and whether it came from the fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub fell_back: bool,
}

/// Answers a task under a policy. Always produces text.
pub struct Generator {
    model: LanguageModel,
}

impl Generator {
    pub fn new(model: LanguageModel) -> Self {
        Self { model }
    }

    /// One creative model call with the policy's instruction.
    pub async fn respond(&self, policy: &Policy, user_input: &str) -> Generation {
        let instruction = build_policy_prompt(policy);
        self.respond_with(&instruction, policy, user_input).await
    }

    /// Like [`Generator::respond`] with a caller-built instruction; `policy`
    /// is only echoed by the fallback text.
    pub async fn respond_with(
        &self,
        instruction: &str,
        policy: &Policy,
        user_input: &str,
    ) -> Generation {
        match self.model.generate(instruction, user_input).await {
            Ok(text) => Generation {
                text,
                fell_back: false,
            },
            Err(err) => {
                warn!(error = %err, "generation failed; returning fallback response");
                Generation {
                    text: fallback_response(policy, &err.to_string()),
                    fell_back: true,
                }
            }
        }
    }
}

/// `[FALLBACK RESPONSE]` block echoing the active policy.
pub fn fallback_response(policy: &Policy, note: &str) -> String {
    let echo = policy
        .schema()
        .fields
        .iter()
        .map(|f| {
            format!(
                "{}={}",
                capitalize(&f.name),
                policy.get(&f.name).unwrap_or(f.default.as_str())
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{FALLBACK_MARKER}\n{echo}\n\nThe language model is unavailable ({note}). Please try again."
    )
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

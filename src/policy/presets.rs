use super::{FieldSpec, PolicySchema};
use crate::error::PolicyError;
use std::sync::Arc;

pub const RESPONSE_SCHEMA: &str = "response";
pub const REWARD_SCHEMA: &str = "reward";
pub const ROUTING_SCHEMA: &str = "routing";

/// Response style: how long, in what tone, in what shape.
pub fn response_schema() -> Arc<PolicySchema> {
    Arc::new(
        PolicySchema::new(RESPONSE_SCHEMA)
            .field(
                FieldSpec::new("verbosity", "LENGTH/DEPTH", "medium")
                    .value(
                        "short",
                        "Be remarkably concise. Get straight to the point. Limit response to 1-3 sentences or points where possible.",
                    )
                    .value(
                        "medium",
                        "Provide a balanced level of detail. Explain key concepts but avoid unnecessary fluff.",
                    )
                    .value(
                        "long",
                        "Be comprehensive and detailed. Explore nuances, provide examples, and ensure thorough coverage.",
                    ),
            )
            .field(
                FieldSpec::new("tone", "TONE", "neutral")
                    .value(
                        "formal",
                        "Use professional, academic, and precise language. Avoid slang or contractions.",
                    )
                    .value(
                        "neutral",
                        "Use clear, objective, and balanced language. Be professional but accessible.",
                    )
                    .value(
                        "casual",
                        "Use friendly, conversational, and relaxed language. You can be personable.",
                    ),
            )
            .field(
                FieldSpec::new("structure", "STRUCTURE", "narrative")
                    .value(
                        "bulleted",
                        "Present your response primarily as a list of bullet points. Use brief introductory and concluding sentences.",
                    )
                    .value(
                        "narrative",
                        "Present your response as connected paragraphs. Tell a coherent story or explanation.",
                    )
                    .value(
                        "steps",
                        "Present your response as a numbered sequence of steps. Ensure clear logical flow.",
                    ),
            ),
    )
}

/// Reward-driven style used by the reinforcement-style loop.
pub fn reward_schema() -> Arc<PolicySchema> {
    Arc::new(
        PolicySchema::new(REWARD_SCHEMA)
            .field(
                FieldSpec::new("verbosity", "VERBOSITY", "medium")
                    .value("short", "Answer in a few sentences; skip background.")
                    .value(
                        "medium",
                        "Give a balanced answer with the key points explained.",
                    )
                    .value(
                        "detailed",
                        "Give a detailed answer with background, examples and edge cases.",
                    ),
            )
            .field(
                FieldSpec::new("tone", "TONE", "neutral")
                    .value("neutral", "Keep a neutral, matter-of-fact tone.")
                    .value("friendly", "Be warm and encouraging.")
                    .value("formal", "Keep a formal, professional register."),
            ),
    )
}

/// Department routing behaviour.
pub fn routing_schema() -> Arc<PolicySchema> {
    Arc::new(
        PolicySchema::new(ROUTING_SCHEMA)
            .field(
                FieldSpec::new("primary_department", "PRIORITY", "billing")
                    .value(
                        "billing",
                        "Check BILLING first, then TECHNICAL, then PRODUCT.",
                    )
                    .value(
                        "technical",
                        "Check TECHNICAL first, then BILLING, then PRODUCT.",
                    )
                    .value(
                        "product",
                        "Check PRODUCT first, then BILLING, then TECHNICAL.",
                    ),
            )
            .field(
                FieldSpec::new("ambiguity_handling", "AMBIGUITY HANDLING", "infer_best")
                    .value(
                        "ask_clarification",
                        "If you are unsure which department fits, route to CLARIFICATION_NEEDED.",
                    )
                    .value(
                        "infer_best",
                        "If you are unsure which department fits, pick the most likely one.",
                    ),
            )
            .field(
                FieldSpec::new("confidence_threshold", "CONFIDENCE THRESHOLD", "high")
                    .value(
                        "low",
                        "Route directly when your confidence is at least 0.6.",
                    )
                    .value(
                        "medium",
                        "Route directly when your confidence is at least 0.8.",
                    )
                    .value(
                        "high",
                        "Route directly when your confidence is at least 0.9.",
                    ),
            )
            .field(
                FieldSpec::new("feedback_weight", "FEEDBACK WEIGHT", "medium")
                    .value("low", "Treat past operator corrections as weak hints.")
                    .value("medium", "Give past operator corrections moderate weight.")
                    .value(
                        "high",
                        "Follow past operator corrections closely, even over your own judgement.",
                    ),
            ),
    )
}

/// Look up a built-in schema by its name.
pub fn schema_by_name(name: &str) -> Result<Arc<PolicySchema>, PolicyError> {
    match name {
        RESPONSE_SCHEMA => Ok(response_schema()),
        REWARD_SCHEMA => Ok(reward_schema()),
        ROUTING_SCHEMA => Ok(routing_schema()),
        other => Err(PolicyError::UnknownSchema(other.to_string())),
    }
}

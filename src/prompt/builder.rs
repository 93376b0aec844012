use super::engine::TeraEngine;
use crate::error::PromptError;
use crate::policy::Policy;
use crate::policy::presets::{RESPONSE_SCHEMA, REWARD_SCHEMA, ROUTING_SCHEMA};
use serde::Serialize;
use std::fmt::Write as _;
use tera::Context;

const POLICY_HEADER: &str =
    "You are an advanced adaptive agent. Your goal is to be helpful and accurate.";
const POLICY_FOOTER: &str = "Follow these instructions strictly for every response.";

const DELTA_EVALUATOR_TEMPLATE: &str = "\
You are a Policy Adaptation Judge.
Your job is to interpret user feedback on an agent's behavior and decide whether the agent's {{ schema }} policy needs to change.

The policy has these fields and allowed values:
{% for field in fields %}- {{ field.name }}: [{{ field.values | join(sep=\", \") }}]
{% endfor %}
CURRENT POLICY:
{{ current_policy }}

INSTRUCTIONS:
1. Analyze the USER FEEDBACK.
2. If the feedback asks for a change, map it to one of the policy fields and one of its allowed values.
3. Return ONLY a JSON object holding the changed fields.
4. If no change is implied (e.g. \"good job\"), return an empty JSON object {}.
{% if examples %}
EXAMPLES:
{% for example in examples %}- Feedback: \"{{ example.feedback }}\" -> {{ example.delta }}
{% endfor %}{% endif %}
Output a single JSON object and nothing else. No code fences.";

const REWARD_EVALUATOR_TEMPLATE: &str = "\
You are a reward model in a reinforcement learning loop.

Your task:
1. Decide whether the feedback is POSITIVE, NEGATIVE or NEUTRAL.
2. Assign a reward: POSITIVE -> 1, NEGATIVE -> -1, NEUTRAL -> 0.

Rules:
- Complaints (e.g. \"too short\", \"too long\", \"confusing\") are NEGATIVE.
- Praise (e.g. \"good\", \"clear\", \"helpful\") is POSITIVE.
- Suggestions imply a NEGATIVE reward.

Then give a direction for each field:
{% for field in fields %}- {{ field.name }} (ordered: {{ field.values | join(sep=\" < \") }}): increase | decrease | no_change{% for value in field.values %} | more_{{ value }}{% endfor %}
{% endfor %}
CURRENT POLICY:
{{ current_policy }}

Return ONLY a JSON object in this shape, with no code fences:
{{ shape_example }}";

const ROUTING_TEMPLATE: &str = "\
You are an Intelligent Routing Agent.
Your job is to route incoming user queries to the correct department.

CURRENT POLICY CONFIGURATION:
- PRIORITY ORDER: {{ priority | join(sep=\", \") }}
- AMBIGUITY HANDLING: {{ ambiguity_handling }}
- CONFIDENCE THRESHOLD: {{ threshold }}
- OPERATOR FEEDBACK: {{ feedback_weight_clause }}

INSTRUCTIONS:
1. Analyze the USER QUERY.
2. Pick the best department from the PRIORITY ORDER, checking earlier entries first.
3. {{ ambiguity_clause }}
4. If your confidence is below {{ threshold }}, route to GENERAL_SUPPORT.

Output a single JSON object and nothing else:
{\"department\": \"BILLING\", \"confidence\": 0.95, \"reasoning\": \"Explanation of choice\"}";

const PERSONA_TEMPLATE: &str = "\
{{ persona_instruction }}
{% if passages %}
## Reference passages
Answer from these passages when they are relevant. Say so when they do not cover the question.
{% for passage in passages %}
[{{ loop.index }}] {{ passage }}
{% endfor %}{% endif %}";

pub const DELTA_EVALUATOR_NAME: &str = "evaluator_delta";
pub const REWARD_EVALUATOR_NAME: &str = "evaluator_reward";
pub const ROUTING_NAME: &str = "routing";
pub const PERSONA_NAME: &str = "persona";

/// Register the built-in templates. Re-registering overwrites silently.
pub fn ensure_defaults(engine: &mut TeraEngine) -> Result<(), PromptError> {
    engine.add_template(DELTA_EVALUATOR_NAME, DELTA_EVALUATOR_TEMPLATE)?;
    engine.add_template(REWARD_EVALUATOR_NAME, REWARD_EVALUATOR_TEMPLATE)?;
    engine.add_template(ROUTING_NAME, ROUTING_TEMPLATE)?;
    engine.add_template(PERSONA_NAME, PERSONA_TEMPLATE)?;
    Ok(())
}

/// Engine with every built-in template registered.
pub fn default_engine() -> Result<TeraEngine, PromptError> {
    let mut engine = TeraEngine::new();
    ensure_defaults(&mut engine)?;
    Ok(engine)
}

/// Behaviour instruction for a policy.
///
/// Pure and total: one numbered `LABEL: clause` line per schema field, in
/// schema order. Missing or unknown values use the field default's clause.
pub fn build_policy_prompt(policy: &Policy) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(POLICY_HEADER);
    out.push_str("\n\nCRITICAL INSTRUCTIONS ON BEHAVIOR:\n");
    for (i, field) in policy.schema().fields.iter().enumerate() {
        let clause = field.clause_for(policy.get(&field.name));
        let _ = writeln!(out, "{}. {}: {}", i + 1, field.label, clause);
    }
    out.push('\n');
    out.push_str(POLICY_FOOTER);
    out.push('\n');
    out
}

#[derive(Serialize)]
struct FieldContext<'a> {
    name: &'a str,
    values: Vec<&'a str>,
}

#[derive(Serialize)]
struct ExampleContext {
    feedback: &'static str,
    delta: &'static str,
}

fn field_context(policy: &Policy) -> Vec<FieldContext<'_>> {
    policy
        .schema()
        .fields
        .iter()
        .map(|f| FieldContext {
            name: &f.name,
            values: f.allowed_values().collect(),
        })
        .collect()
}

fn pretty_policy(policy: &Policy) -> Result<String, PromptError> {
    serde_json::to_string_pretty(policy).map_err(|e| PromptError::Render(e.to_string()))
}

/// Few-shot examples for the delta evaluator, keyed by schema.
fn delta_examples(schema: &str) -> &'static [(&'static str, &'static str)] {
    match schema {
        RESPONSE_SCHEMA => &[
            ("Too long, make it brief", r#"{"verbosity": "short"}"#),
            ("Be more professional", r#"{"tone": "formal"}"#),
            ("Can you list this out?", r#"{"structure": "bulleted"}"#),
            ("I don't like this", "{}"),
        ],
        REWARD_SCHEMA => &[
            ("Way too terse, give me more", r#"{"verbosity": "detailed"}"#),
            ("Could you be a bit warmer?", r#"{"tone": "friendly"}"#),
            ("Great answer", "{}"),
        ],
        ROUTING_SCHEMA => &[
            (
                "Stop guessing! Ask me if you don't know.",
                r#"{"ambiguity_handling": "ask_clarification"}"#,
            ),
            (
                "You are too cautious, just route it.",
                r#"{"confidence_threshold": "low"}"#,
            ),
            (
                "Billing is most important, check that first.",
                r#"{"primary_department": "billing"}"#,
            ),
        ],
        _ => &[],
    }
}

/// Instruction asking the model for a `{field: value}` delta.
pub fn build_delta_evaluator_prompt(
    engine: &TeraEngine,
    policy: &Policy,
) -> Result<String, PromptError> {
    let schema = &policy.schema().name;
    let examples: Vec<ExampleContext> = delta_examples(schema)
        .iter()
        .map(|&(feedback, delta)| ExampleContext { feedback, delta })
        .collect();

    let mut ctx = Context::new();
    ctx.insert("schema", schema);
    ctx.insert("fields", &field_context(policy));
    ctx.insert("current_policy", &pretty_policy(policy)?);
    ctx.insert("examples", &examples);
    engine.render(DELTA_EVALUATOR_NAME, &ctx)
}

/// Instruction asking the model for a reward plus per-field directions.
pub fn build_reward_evaluator_prompt(
    engine: &TeraEngine,
    policy: &Policy,
) -> Result<String, PromptError> {
    let dimensions: serde_json::Map<String, serde_json::Value> = policy
        .schema()
        .field_names()
        .map(|name| (name.to_string(), serde_json::Value::from("no_change")))
        .collect();

    let shape = serde_json::json!({"reward": -1, "dimensions": dimensions});

    let mut ctx = Context::new();
    ctx.insert("fields", &field_context(policy));
    ctx.insert("current_policy", &pretty_policy(policy)?);
    ctx.insert("shape_example", &shape.to_string());
    engine.render(REWARD_EVALUATOR_NAME, &ctx)
}

/// Inputs for the routing instruction, already resolved from a routing policy.
#[derive(Debug, Clone)]
pub struct RoutingPromptInput<'a> {
    pub priority: Vec<&'a str>,
    pub ambiguity_handling: &'a str,
    pub ambiguity_clause: &'a str,
    pub threshold: f64,
    pub feedback_weight_clause: &'a str,
}

pub fn build_routing_prompt(
    engine: &TeraEngine,
    input: &RoutingPromptInput<'_>,
) -> Result<String, PromptError> {
    let mut ctx = Context::new();
    ctx.insert("priority", &input.priority);
    ctx.insert("ambiguity_handling", input.ambiguity_handling);
    ctx.insert("ambiguity_clause", input.ambiguity_clause);
    ctx.insert("threshold", &format!("{:.1}", input.threshold));
    ctx.insert("feedback_weight_clause", input.feedback_weight_clause);
    engine.render(ROUTING_NAME, &ctx)
}

/// System prompt for a persona chat turn, optionally grounded in passages.
pub fn build_persona_prompt(
    engine: &TeraEngine,
    persona_instruction: &str,
    passages: &[String],
) -> Result<String, PromptError> {
    let mut ctx = Context::new();
    ctx.insert("persona_instruction", persona_instruction);
    ctx.insert("passages", passages);
    engine.render(PERSONA_NAME, &ctx)
}

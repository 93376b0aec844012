use super::{ConfidenceThreshold, Department, RoutingDecision};
use crate::error::{ModelError, PromptError};
use crate::policy::Policy;
use crate::prompt::{RoutingPromptInput, TeraEngine, build_routing_prompt, default_engine};
use crate::providers::LanguageModel;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, warn};

const PARSE_FAILURE: &str = "Failed to parse JSON response";

/// Routes queries with a deterministic model call steered by a routing policy.
pub struct RoutingAgent {
    model: LanguageModel,
    templates: TeraEngine,
}

impl RoutingAgent {
    pub fn new(model: LanguageModel) -> Result<Self, PromptError> {
        Ok(Self {
            model,
            templates: default_engine()?,
        })
    }

    /// Never fails: model or parse errors produce an `ERROR` decision with
    /// zero confidence.
    pub async fn route(&self, query: &str, policy: &Policy) -> RoutingDecision {
        let threshold = threshold_for(policy);
        let instruction = match self.instruction(policy, threshold) {
            Ok(instruction) => instruction,
            Err(err) => {
                warn!(error = %err, "routing prompt failed to render");
                return RoutingDecision::error(err.to_string());
            }
        };

        let reply = match self.model.generate(&instruction, query).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "routing model call failed");
                return RoutingDecision::error(err.to_string());
            }
        };

        match parse_decision(&reply) {
            Ok(decision) => {
                let routed = decision.enforce_threshold(threshold);
                debug!(
                    department = %routed.department,
                    confidence = routed.confidence,
                    rerouted = routed.rerouted_from.is_some(),
                    "query routed"
                );
                routed
            }
            Err(err) => {
                warn!(error = %err, reply = %reply, "unparseable routing reply");
                RoutingDecision::error(PARSE_FAILURE)
            }
        }
    }

    fn instruction(
        &self,
        policy: &Policy,
        threshold: ConfidenceThreshold,
    ) -> Result<String, PromptError> {
        let input = RoutingPromptInput {
            priority: priority_order(policy),
            ambiguity_handling: policy.get("ambiguity_handling").unwrap_or("infer_best"),
            ambiguity_clause: clause(policy, "ambiguity_handling"),
            threshold: threshold.value(),
            feedback_weight_clause: clause(policy, "feedback_weight"),
        };
        build_routing_prompt(&self.templates, &input)
    }
}

/// The policy's primary department first, the rest in default order.
pub fn priority_order(policy: &Policy) -> Vec<&'static str> {
    let primary = policy
        .get("primary_department")
        .and_then(|v| Department::from_str(v).ok())
        .filter(|d| Department::ROUTABLE.contains(d));

    primary
        .into_iter()
        .chain(Department::ROUTABLE.into_iter().filter(|d| Some(*d) != primary))
        .map(Department::as_str)
        .collect()
}

fn threshold_for(policy: &Policy) -> ConfidenceThreshold {
    policy
        .get("confidence_threshold")
        .and_then(|v| ConfidenceThreshold::from_str(v).ok())
        .unwrap_or(ConfidenceThreshold::High)
}

fn clause<'a>(policy: &'a Policy, field: &str) -> &'a str {
    policy
        .schema()
        .get(field)
        .map_or("", |spec| spec.clause_for(policy.get(field)))
}

#[derive(Deserialize)]
struct RawDecision {
    department: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Strict parse of `{"department", "confidence", "reasoning"}`.
pub fn parse_decision(reply: &str) -> Result<RoutingDecision, ModelError> {
    let raw: RawDecision = serde_json::from_str(reply.trim()).map_err(|e| {
        ModelError::response_invalid(format!("routing reply is not a decision object: {e}"))
    })?;

    let department = Department::from_str(raw.department.trim()).map_err(|_| {
        ModelError::response_invalid(format!("unknown department: {}", raw.department))
    })?;
    if !(0.0..=1.0).contains(&raw.confidence) {
        return Err(ModelError::response_invalid(format!(
            "confidence out of range: {}",
            raw.confidence
        )));
    }

    Ok(RoutingDecision {
        department,
        confidence: raw.confidence,
        reasoning: raw.reasoning,
        rerouted_from: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyDelta, PolicyEngine, routing_schema};
    use crate::providers::{Determinism, Provider};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Fixed {
        reply: Option<&'static str>,
        system: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Provider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn chat_with_system(
            &self,
            system_prompt: Option<&str>,
            _message: &str,
            _model: &str,
            _temperature: f64,
        ) -> anyhow::Result<String> {
            *self.system.lock().unwrap() = system_prompt.map(str::to_string);
            self.reply
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("quota exceeded"))
        }
    }

    fn agent(reply: Option<&'static str>) -> (RoutingAgent, Arc<Fixed>) {
        let provider = Arc::new(Fixed {
            reply,
            system: Mutex::new(None),
        });
        let model = LanguageModel::new(provider.clone(), "router", Determinism::Deterministic);
        (RoutingAgent::new(model).unwrap(), provider)
    }

    #[test]
    fn priority_puts_primary_first() {
        let policy = routing_schema().default_policy();
        assert_eq!(priority_order(&policy), vec!["BILLING", "TECHNICAL", "PRODUCT"]);

        let policy = PolicyEngine::apply(
            &policy,
            &PolicyDelta::new().with("primary_department", "product"),
        );
        assert_eq!(priority_order(&policy), vec!["PRODUCT", "BILLING", "TECHNICAL"]);
    }

    #[test]
    fn parse_rejects_fences_and_unknown_departments() {
        assert!(
            parse_decision("```json\n{\"department\":\"BILLING\",\"confidence\":1}\n```").is_err()
        );
        assert!(parse_decision(r#"{"department":"SALES","confidence":0.9}"#).is_err());
        assert!(parse_decision(r#"{"department":"BILLING","confidence":1.5}"#).is_err());

        let decision =
            parse_decision(r#"{"department":"technical","confidence":0.7,"reasoning":"crash"}"#)
                .unwrap();
        assert_eq!(decision.department, Department::Technical);
        assert_eq!(decision.reasoning, "crash");
    }

    #[tokio::test]
    async fn confident_decision_is_kept() {
        let (agent, provider) =
            agent(Some(r#"{"department":"BILLING","confidence":0.95,"reasoning":"refund"}"#));
        let decision = agent
            .route("I need a refund", &routing_schema().default_policy())
            .await;

        assert_eq!(decision.department, Department::Billing);
        let system = provider.system.lock().unwrap().clone().unwrap();
        assert!(system.contains("PRIORITY ORDER: BILLING, TECHNICAL, PRODUCT"));
        assert!(system.contains("CONFIDENCE THRESHOLD: 0.9"));
    }

    #[tokio::test]
    async fn below_threshold_goes_to_general_support() {
        let (agent, _) =
            agent(Some(r#"{"department":"PRODUCT","confidence":0.7,"reasoning":"?"}"#));
        let policy = routing_schema().default_policy();
        let decision = agent.route("maybe a feature?", &policy).await;
        assert_eq!(decision.department, Department::GeneralSupport);
        assert_eq!(decision.rerouted_from, Some(Department::Product));

        let relaxed = PolicyEngine::apply(
            &policy,
            &PolicyDelta::new().with("confidence_threshold", "low"),
        );
        let decision = agent.route("maybe a feature?", &relaxed).await;
        assert_eq!(decision.department, Department::Product);
    }

    #[tokio::test]
    async fn garbage_reply_is_an_error_decision() {
        let (agent, _) = agent(Some("BILLING, probably"));
        let decision = agent.route("q", &routing_schema().default_policy()).await;
        assert_eq!(decision, RoutingDecision::error("Failed to parse JSON response"));
    }

    #[tokio::test]
    async fn model_outage_is_an_error_decision() {
        let (agent, _) = agent(None);
        let decision = agent.route("q", &routing_schema().default_policy()).await;
        assert_eq!(decision.department, Department::Error);
        assert!(decision.confidence.abs() < f64::EPSILON);
        assert!(decision.reasoning.contains("quota exceeded"));
    }
}

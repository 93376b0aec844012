//! Department routing: a model-driven agent steered by the routing policy,
//! and a keyword baseline.

pub mod agent;
pub mod static_router;

pub use agent::{RoutingAgent, parse_decision};
pub use static_router::StaticRouter;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Department {
    Billing,
    Technical,
    Product,
    GeneralSupport,
    ClarificationNeeded,
    /// The decision could not be obtained from the model.
    Error,
}

impl Department {
    /// Routable departments in their default priority order.
    pub const ROUTABLE: [Self; 3] = [Self::Billing, Self::Technical, Self::Product];

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Catch-all outcomes that are never re-routed.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::GeneralSupport | Self::ClarificationNeeded | Self::Error
        )
    }
}

/// Minimum confidence for a direct route, chosen by the
/// `confidence_threshold` policy field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConfidenceThreshold {
    Low,
    Medium,
    High,
}

impl ConfidenceThreshold {
    pub fn value(self) -> f64 {
        match self {
            Self::Low => 0.6,
            Self::Medium => 0.8,
            Self::High => 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub department: Department,
    pub confidence: f64,
    pub reasoning: String,
    /// Department the model picked before a low-confidence re-route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerouted_from: Option<Department>,
}

impl RoutingDecision {
    pub fn error(reasoning: impl Into<String>) -> Self {
        Self {
            department: Department::Error,
            confidence: 0.0,
            reasoning: reasoning.into(),
            rerouted_from: None,
        }
    }

    /// Send a decision below `threshold` to general support.
    #[must_use]
    pub fn enforce_threshold(self, threshold: ConfidenceThreshold) -> Self {
        if self.department.is_terminal() || self.confidence >= threshold.value() {
            return self;
        }
        Self {
            department: Department::GeneralSupport,
            rerouted_from: Some(self.department),
            ..self
        }
    }
}

//! Free-text feedback → structured policy change.
//!
//! The interpreter asks a deterministic model to classify feedback, parses
//! the reply strictly, lets the keyword guardrails override the result and
//! finally [`resolve`]s the assessment into a concrete [`PolicyDelta`].
//!
//! [`PolicyDelta`]: crate::policy::PolicyDelta

pub mod guardrail;
pub mod interpreter;
pub mod parse;
pub mod resolve;

pub use guardrail::{Guardrail, GuardrailEffect, MarkerMatch, default_guardrails};
pub use interpreter::FeedbackInterpreter;
pub use resolve::resolve;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumString};

/// Which reply shape the evaluator model is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InterpreterMode {
    /// `{field: value}` objects; every non-empty delta is applied.
    Delta,
    /// `{"reward": r, "dimensions": {...}}`; learns only when `r < 0`.
    Reward,
}

/// Requested movement of one policy field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Adjustment {
    /// One step towards the end of the field's ordered values.
    Increase,
    /// One step towards the start of the field's ordered values.
    Decrease,
    Set(String),
    NoChange,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase => f.write_str("increase"),
            Self::Decrease => f.write_str("decrease"),
            Self::Set(value) => write!(f, "set({value})"),
            Self::NoChange => f.write_str("no_change"),
        }
    }
}

/// Satisfaction signal in `{-1, 0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reward {
    Negative,
    Neutral,
    Positive,
}

impl Reward {
    pub fn value(self) -> i8 {
        match self {
            Self::Negative => -1,
            Self::Neutral => 0,
            Self::Positive => 1,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::Negative),
            0 => Some(Self::Neutral),
            1 => Some(Self::Positive),
            _ => None,
        }
    }

    pub fn is_negative(self) -> bool {
        self == Self::Negative
    }
}

impl fmt::Display for Reward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Serialize for Reward {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

impl<'de> Deserialize<'de> for Reward {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::from_value(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("reward {raw} not in {{-1, 0, 1}}")))
    }
}

/// Where an assessment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssessmentSource {
    /// Parsed from the evaluator model's reply.
    Model,
    /// Model unavailable or reply invalid; adjustments start empty.
    Fallback,
}

/// Interpreted feedback, before resolution against a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
    pub adjustments: BTreeMap<String, Adjustment>,
    pub source: AssessmentSource,
    /// Markers of the guardrails that overrode this assessment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guardrails: Vec<String>,
}

impl Assessment {
    pub fn new(source: AssessmentSource) -> Self {
        Self {
            reward: None,
            adjustments: BTreeMap::new(),
            source,
            guardrails: Vec::new(),
        }
    }

    /// Safe default used when the model cannot be trusted: no adjustments,
    /// and a neutral reward in reward mode.
    pub fn fallback(mode: InterpreterMode) -> Self {
        let mut assessment = Self::new(AssessmentSource::Fallback);
        if mode == InterpreterMode::Reward {
            assessment.reward = Some(Reward::Neutral);
        }
        assessment
    }

    pub fn adjustment(&self, field: &str) -> Option<&Adjustment> {
        self.adjustments.get(field)
    }

    /// True when no field would move.
    pub fn is_no_op(&self) -> bool {
        self.adjustments.values().all(|a| *a == Adjustment::NoChange)
    }
}

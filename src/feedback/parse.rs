//! Strict parsing of evaluator replies.
//!
//! The whole trimmed reply must be one JSON object of the expected shape.
//! Code fences, prose around the object and wrong value types are all
//! [`ModelError::ResponseInvalid`]; nothing is sliced or repaired.

use super::{Adjustment, Assessment, AssessmentSource, InterpreterMode, Reward};
use crate::error::ModelError;
use serde_json::{Map, Value};

pub fn parse_reply(mode: InterpreterMode, reply: &str) -> Result<Assessment, ModelError> {
    match mode {
        InterpreterMode::Delta => parse_delta(reply),
        InterpreterMode::Reward => parse_reward(reply),
    }
}

fn parse_object(reply: &str) -> Result<Map<String, Value>, ModelError> {
    let value: Value = serde_json::from_str(reply.trim())
        .map_err(|e| ModelError::response_invalid(format!("not a JSON document: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ModelError::response_invalid(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `{"field": "value", ...}`; `{}` means no change.
pub fn parse_delta(reply: &str) -> Result<Assessment, ModelError> {
    let object = parse_object(reply)?;
    let mut assessment = Assessment::new(AssessmentSource::Model);
    for (field, value) in object {
        let Value::String(value) = value else {
            return Err(ModelError::response_invalid(format!(
                "value for `{field}` must be a string, got {}",
                json_kind(&value)
            )));
        };
        assessment.adjustments.insert(field, Adjustment::Set(value));
    }
    Ok(assessment)
}

/// `{"reward": -1|0|1, "dimensions": {"field": direction}}`.
pub fn parse_reward(reply: &str) -> Result<Assessment, ModelError> {
    let mut object = parse_object(reply)?;

    let reward = match object.remove("reward") {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(Reward::from_value)
            .ok_or_else(|| {
                ModelError::response_invalid(format!("reward {n} not in {{-1, 0, 1}}"))
            })?,
        Some(other) => {
            return Err(ModelError::response_invalid(format!(
                "reward must be an integer, got {}",
                json_kind(&other)
            )));
        }
        None => return Err(ModelError::response_invalid("missing `reward`")),
    };

    let dimensions = match object.remove("dimensions") {
        Some(Value::Object(map)) => map,
        None => Map::new(),
        Some(other) => {
            return Err(ModelError::response_invalid(format!(
                "dimensions must be an object, got {}",
                json_kind(&other)
            )));
        }
    };

    let mut assessment = Assessment::new(AssessmentSource::Model);
    assessment.reward = Some(reward);
    for (field, direction) in dimensions {
        let Value::String(direction) = direction else {
            return Err(ModelError::response_invalid(format!(
                "direction for `{field}` must be a string"
            )));
        };
        let adjustment = parse_direction(&direction).ok_or_else(|| {
            ModelError::response_invalid(format!("unknown direction `{direction}` for `{field}`"))
        })?;
        assessment.adjustments.insert(field, adjustment);
    }
    Ok(assessment)
}

/// `increase`, `decrease`, `no_change` or `more_<value>`.
fn parse_direction(direction: &str) -> Option<Adjustment> {
    match direction {
        "increase" => Some(Adjustment::Increase),
        "decrease" => Some(Adjustment::Decrease),
        "no_change" => Some(Adjustment::NoChange),
        other => other
            .strip_prefix("more_")
            .filter(|value| !value.is_empty())
            .map(|value| Adjustment::Set(value.to_string())),
    }
}

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// System instruction used when no persona has been chosen.
pub const DEFAULT_INSTRUCTION: &str = "You are a helpful conversational AI assistant.";

/// Audience a chat session answers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Persona {
    Tech,
    Manager,
    #[strum(
        to_string = "Business Leader",
        serialize = "business-leader",
        serialize = "business_leader"
    )]
    #[serde(rename = "Business Leader")]
    BusinessLeader,
    #[strum(to_string = "HR")]
    #[serde(rename = "HR")]
    Hr,
}

impl Persona {
    pub const ALL: [Self; 4] = [Self::Tech, Self::Manager, Self::BusinessLeader, Self::Hr];

    pub fn instruction(self) -> &'static str {
        match self {
            Self::Tech => {
                "You are a highly technical expert. Use precise technical language, architectures, \
                 APIs, code-level explanations, and implementation details."
            }
            Self::Manager => {
                "You are a delivery-focused manager. Emphasize execution, upskilling, timelines, \
                 team productivity, and practical outcomes."
            }
            Self::BusinessLeader => {
                "You are a strategic business leader. Focus on ROI, business impact, competitive \
                 advantage, risk, and high-level decision-making."
            }
            Self::Hr => {
                "You are an HR leader. Focus on people, skills, learning paths, culture, \
                 organizational growth, and HR terminology."
            }
        }
    }
}

/// Instruction for an optional persona.
pub fn instruction_for(persona: Option<Persona>) -> &'static str {
    persona.map_or(DEFAULT_INSTRUCTION, Persona::instruction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn display_uses_human_names() {
        let names: Vec<String> = Persona::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["Tech", "Manager", "Business Leader", "HR"]);
    }

    #[test]
    fn parses_loosely() {
        assert_eq!(Persona::from_str("hr").unwrap(), Persona::Hr);
        assert_eq!(Persona::from_str("business-leader").unwrap(), Persona::BusinessLeader);
        assert_eq!(Persona::from_str("Business Leader").unwrap(), Persona::BusinessLeader);
        assert!(Persona::from_str("pirate").is_err());
    }

    #[test]
    fn missing_persona_uses_default_instruction() {
        assert_eq!(instruction_for(None), DEFAULT_INSTRUCTION);
        assert!(
            instruction_for(Some(Persona::Tech)).starts_with("You are a highly technical expert.")
        );
        assert!(!Persona::Tech.instruction().contains("  "));
    }
}

use crate::feedback::InterpreterMode;
use crate::session::Persona;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// `adaptive-agent` - feedback-driven policy adaptation for LLM agents.
#[derive(Parser, Debug)]
#[command(name = "adaptive-agent")]
#[command(version)]
#[command(about = "Answer, take feedback, adapt the policy, answer again.", long_about = None)]
pub struct Cli {
    /// Provider to use (openai, openrouter, groq, mistral, deepseek, together, ollama, custom)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model for generation (evaluator and router default to it too)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Policy history file
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive loop: task, answer, feedback, adapted answer
    Adapt {
        /// How feedback is judged: `delta` (field values) or `reward` (-1/0/1 plus directions)
        #[arg(long, default_value = "delta", value_parser = parse_mode)]
        mode: InterpreterMode,

        /// Policy schema (response, reward, routing); defaults to the mode's usual schema
        #[arg(long)]
        schema: Option<String>,

        /// Run one cycle without prompting (requires --feedback)
        #[arg(long, requires = "feedback")]
        task: Option<String>,

        /// Feedback for the single non-interactive cycle
        #[arg(long, requires = "task")]
        feedback: Option<String>,
    },

    /// Answer one message under the current policy
    Respond {
        #[arg(short, long)]
        message: String,

        #[arg(long, default_value = "response")]
        schema: String,
    },

    /// Route support queries to a department
    Route {
        /// Use the keyword router instead of the model
        #[arg(long = "static")]
        use_static: bool,

        /// Route one query and exit
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Multi-session persona chat
    Chat {
        /// Tech, Manager, "Business Leader" or HR (locked after the first message)
        #[arg(long, value_parser = parse_persona)]
        persona: Option<Persona>,

        /// Session name
        #[arg(long)]
        name: Option<String>,

        /// Plain-text document to answer from
        #[arg(long)]
        docs: Option<PathBuf>,
    },

    /// Inspect the stored policy
    Policy {
        #[command(subcommand)]
        policy_command: PolicyCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Print the current policy and its instruction text
    Show {
        #[arg(long, default_value = "response")]
        schema: String,
    },

    /// List recorded policy changes, newest last
    History {
        /// Only changes to this schema
        #[arg(long)]
        schema: Option<String>,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn parse_mode(raw: &str) -> Result<InterpreterMode, String> {
    InterpreterMode::from_str(raw)
        .map_err(|_| format!("unknown mode '{raw}'; expected delta or reward"))
}

fn parse_persona(raw: &str) -> Result<Persona, String> {
    Persona::from_str(raw).map_err(|_| {
        let known: Vec<String> = Persona::ALL.iter().map(ToString::to_string).collect();
        format!("unknown persona '{raw}'; expected one of: {}", known.join(", "))
    })
}

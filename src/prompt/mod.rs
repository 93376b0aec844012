mod builder;
mod engine;

pub use builder::{
    RoutingPromptInput, build_delta_evaluator_prompt, build_persona_prompt, build_policy_prompt,
    build_reward_evaluator_prompt, build_routing_prompt, default_engine, ensure_defaults,
};
pub use engine::TeraEngine;

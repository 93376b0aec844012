#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod adaptation;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod feedback;
pub mod generator;
pub mod history;
pub mod policy;
pub mod prompt;
pub mod providers;
pub mod retrieval;
pub mod routing;
pub mod session;

pub use adaptation::{AdaptationLoop, CycleReport};
pub use config::Config;
pub use policy::{Policy, PolicyDelta, PolicyEngine, PolicySchema};

pub mod compatible;
pub mod factory;
pub mod http_client;
pub mod model;
pub mod ollama;
pub mod scrub;
pub mod traits;

pub use factory::{ProviderOptions, create_provider, resolve_api_key};
pub use http_client::DEFAULT_TIMEOUT_SECS;
pub use model::{Determinism, LanguageModel};
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};
pub use traits::{ChatMessage, ChatRole, Provider};

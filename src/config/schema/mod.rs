mod env_overrides;
mod loader;
mod observability;
#[cfg(test)]
mod test_env;
mod types;

pub use observability::ObservabilityConfig;
pub use types::{Config, HistoryConfig, ModelsConfig, ProviderConfig, SessionsConfig};

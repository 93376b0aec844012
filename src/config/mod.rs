pub mod schema;

pub use schema::{
    Config, HistoryConfig, ModelsConfig, ObservabilityConfig, ProviderConfig, SessionsConfig,
};

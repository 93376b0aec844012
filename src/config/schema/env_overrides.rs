use super::Config;
use std::path::PathBuf;

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty("ADAPTIVE_AGENT_API_KEY").or_else(|| non_empty("API_KEY")) {
            self.provider.api_key = Some(key);
        }

        if let Some(provider) = non_empty("ADAPTIVE_AGENT_PROVIDER") {
            self.provider.name = provider;
        }

        if let Some(url) = non_empty("ADAPTIVE_AGENT_BASE_URL") {
            self.provider.base_url = Some(url);
        }

        if let Some(model) = non_empty("ADAPTIVE_AGENT_MODEL") {
            self.models.model = model;
        }

        if let Some(model) = non_empty("ADAPTIVE_AGENT_EVALUATOR_MODEL") {
            self.models.evaluator_model = Some(model);
        }

        if let Some(path) = non_empty("ADAPTIVE_AGENT_HISTORY") {
            self.history.path = Some(PathBuf::from(path));
        }

        if let Some(temp) = non_empty("ADAPTIVE_AGENT_TEMPERATURE")
            .and_then(|t| t.parse::<f64>().ok())
            .filter(|t| (0.0..=2.0).contains(t))
        {
            self.models.temperature = temp;
        }

        if let Some(level) = non_empty("ADAPTIVE_AGENT_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_env::{ENV_LOCK, EnvVarGuard};
    use super::*;

    #[test]
    fn env_wins_over_file_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _key = EnvVarGuard::set("ADAPTIVE_AGENT_API_KEY", "sk-env");
        let _provider = EnvVarGuard::set("ADAPTIVE_AGENT_PROVIDER", "groq");
        let _model = EnvVarGuard::set("ADAPTIVE_AGENT_MODEL", "llama-3.1-8b-instant");
        let _judge = EnvVarGuard::set("ADAPTIVE_AGENT_EVALUATOR_MODEL", "judge");
        let _history = EnvVarGuard::set("ADAPTIVE_AGENT_HISTORY", "/tmp/h.json");
        let _url = EnvVarGuard::set("ADAPTIVE_AGENT_BASE_URL", "http://localhost:9000/v1");
        let _temp = EnvVarGuard::set("ADAPTIVE_AGENT_TEMPERATURE", "0.2");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.provider.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.provider.name, "groq");
        assert_eq!(config.provider.base_url.as_deref(), Some("http://localhost:9000/v1"));
        assert_eq!(config.models.model, "llama-3.1-8b-instant");
        assert_eq!(config.evaluator_model(), "judge");
        assert_eq!(config.history_path(), PathBuf::from("/tmp/h.json"));
        assert!((config.models.temperature - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn blank_and_invalid_values_are_ignored() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _key = EnvVarGuard::set("ADAPTIVE_AGENT_API_KEY", "  ");
        let _generic = EnvVarGuard::unset("API_KEY");
        let _provider = EnvVarGuard::unset("ADAPTIVE_AGENT_PROVIDER");
        let _temp = EnvVarGuard::set("ADAPTIVE_AGENT_TEMPERATURE", "7");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.provider.api_key, None);
        assert_eq!(config.provider.name, "openai");
        assert!((config.models.temperature - 0.7).abs() < f64::EPSILON);
    }
}

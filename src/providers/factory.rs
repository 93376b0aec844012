use super::compatible::OpenAiCompatibleProvider;
use super::http_client::DEFAULT_TIMEOUT_SECS;
use super::ollama::OllamaProvider;
use super::traits::Provider;

/// Knobs shared by every provider the factory can build.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Overrides the provider's default endpoint. Required for `custom`.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Ask the server to emit a bare JSON object.
    pub json_mode: bool,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            json_mode: false,
        }
    }
}

const GENERIC_KEY_ENV: [&str; 2] = ["ADAPTIVE_AGENT_API_KEY", "API_KEY"];

/// Resolve the API key for a provider.
///
/// Resolution order:
/// 1. Explicitly provided `api_key` (trimmed, ignored if empty)
/// 2. Provider-specific environment variable (e.g. `OPENAI_API_KEY`)
/// 3. Generic fallback variables (`ADAPTIVE_AGENT_API_KEY`, `API_KEY`)
pub fn resolve_api_key(name: &str, explicit_api_key: Option<&str>) -> Option<String> {
    if let Some(key) = explicit_api_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    let provider_env: &[&str] = match name {
        "openai" => &["OPENAI_API_KEY"],
        "openrouter" => &["OPENROUTER_API_KEY"],
        "groq" => &["GROQ_API_KEY"],
        "mistral" => &["MISTRAL_API_KEY"],
        "deepseek" => &["DEEPSEEK_API_KEY"],
        "together" | "together-ai" => &["TOGETHER_API_KEY"],
        _ => &[],
    };

    provider_env
        .iter()
        .chain(GENERIC_KEY_ENV.iter())
        .find_map(|var| {
            std::env::var(var)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
}

fn default_base_url(name: &str) -> Option<(&'static str, &'static str)> {
    let entry = match name {
        "openai" => ("OpenAI", "https://api.openai.com/v1"),
        "openrouter" => ("OpenRouter", "https://openrouter.ai/api/v1"),
        "groq" => ("Groq", "https://api.groq.com/openai/v1"),
        "mistral" => ("Mistral", "https://api.mistral.ai/v1"),
        "deepseek" => ("DeepSeek", "https://api.deepseek.com"),
        "together" | "together-ai" => ("Together AI", "https://api.together.xyz/v1"),
        _ => return None,
    };
    Some(entry)
}

pub fn create_provider(
    name: &str,
    api_key: Option<&str>,
    options: &ProviderOptions,
) -> anyhow::Result<Box<dyn Provider>> {
    let base_url = options.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty());

    match name {
        "ollama" => Ok(Box::new(
            OllamaProvider::new(base_url, options.timeout_secs).with_json_mode(options.json_mode),
        )),
        "custom" => {
            let Some(url) = base_url else {
                anyhow::bail!("provider `custom` requires `base_url` in config.toml");
            };
            let key = resolve_api_key(name, api_key);
            Ok(Box::new(
                OpenAiCompatibleProvider::new("Custom", url, key.as_deref(), options.timeout_secs)
                    .with_json_mode(options.json_mode),
            ))
        }
        other => {
            let Some((label, default_url)) = default_base_url(other) else {
                anyhow::bail!(
                    "Unknown provider: {other}. Supported: openai, openrouter, groq, mistral, deepseek, together, ollama, custom"
                );
            };
            let key = resolve_api_key(other, api_key);
            Ok(Box::new(
                OpenAiCompatibleProvider::new(
                    label,
                    base_url.unwrap_or(default_url),
                    key.as_deref(),
                    options.timeout_secs,
                )
                .with_json_mode(options.json_mode),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins_and_is_trimmed() {
        assert_eq!(
            resolve_api_key("openai", Some("  sk-explicit  ")).as_deref(),
            Some("sk-explicit")
        );
    }

    #[test]
    fn known_providers_build() {
        let options = ProviderOptions::default();
        for name in ["openai", "openrouter", "groq", "mistral", "deepseek", "together", "ollama"] {
            let provider = create_provider(name, Some("key"), &options);
            assert!(provider.is_ok(), "{name} should build");
        }
    }

    #[test]
    fn provider_names_are_human_readable() {
        let options = ProviderOptions::default();
        let p = create_provider("openrouter", Some("key"), &options).unwrap();
        assert_eq!(p.name(), "OpenRouter");
        let p = create_provider("ollama", None, &options).unwrap();
        assert_eq!(p.name(), "Ollama");
    }

    #[test]
    fn custom_requires_base_url() {
        let err = create_provider("custom", Some("key"), &ProviderOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("base_url"));

        let options = ProviderOptions {
            base_url: Some("http://localhost:8080/v1".into()),
            ..ProviderOptions::default()
        };
        assert!(create_provider("custom", Some("key"), &options).is_ok());
    }

    #[test]
    fn unknown_provider_errors() {
        let err = create_provider("nonexistent", None, &ProviderOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown provider"));
    }
}

use adaptive_agent::adaptation::AdaptationLoop;
use adaptive_agent::app::wiring::{build_models, open_history};
use adaptive_agent::config::Config;
use adaptive_agent::feedback::{FeedbackInterpreter, InterpreterMode};
use adaptive_agent::generator::{FALLBACK_MARKER, Generator};
use adaptive_agent::policy::response_schema;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.provider.name = "custom".into();
    config.provider.base_url = Some(server.uri());
    config.provider.api_key = Some("test-key".into());
    config.provider.timeout_secs = 5;
    config.history.path = Some(dir.path().join("policy_history.json"));
    config
}

#[tokio::test]
async fn full_cycle_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "temperature": 0.0,
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"verbosity": "short", "structure": "bulleted"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"temperature": 0.7})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("Here is the answer.")),
        )
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = config_for(&server, &dir);
    config.provider.json_mode = true;
    let models = build_models(&config).unwrap();
    let interpreter = FeedbackInterpreter::new(models.evaluator, InterpreterMode::Delta).unwrap();
    let mut agent = AdaptationLoop::new(
        Generator::new(models.generator),
        interpreter,
        open_history(&config),
        &response_schema(),
    );

    let report = agent
        .run_cycle(
            "Explain TLS",
            "Too long and complicated. Explain it simply in bullet points.",
        )
        .await
        .unwrap();

    assert!(!report.first.fell_back);
    assert_eq!(report.second.text, "Here is the answer.");
    assert_eq!(report.policy_after.get("verbosity"), Some("short"));
    assert_eq!(report.policy_after.get("structure"), Some("bulleted"));
    assert!(!agent.history().is_degraded());
    assert!(dir.path().join("policy_history.json").exists());
}

#[tokio::test]
async fn server_error_produces_fallback_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir);
    let generator = Generator::new(build_models(&config).unwrap().generator);

    let generation = generator
        .respond(&response_schema().default_policy(), "hello")
        .await;

    assert!(generation.fell_back);
    assert!(generation.text.starts_with(FALLBACK_MARKER));
    assert!(generation.text.contains("503"));
}

use serde_json::json;
use std::time::Duration;
use tablewatch::ai::{AiError, AiHelper};
use tablewatch::model::SiliconFlowConfig;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> SiliconFlowConfig {
    SiliconFlowConfig {
        api_key: "sk-test".to_string(),
        model: String::new(),
        default_prompt: "Summarize: {content}".to_string(),
    }
}

fn helper(server: &MockServer) -> AiHelper {
    AiHelper::new(Some(server.uri()), Duration::from_secs(5))
        .expect("ai helper")
        .with_retry_delay(Duration::from_millis(1))
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn parse_sends_prompt_and_returns_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "Qwen/Qwen2.5-7B-Instruct",
            "stream": false,
            "messages": [
                {"role": "system", "content": "You are a helpful AI assistant."},
                {"role": "user", "content": "Summarize: order 42 shipped"}
            ]
        })))
        .respond_with(completion("shipped"))
        .expect(1)
        .mount(&server)
        .await;

    let answer = helper(&server)
        .parse(&settings(), "order 42 shipped", None, None)
        .await
        .expect("parse");
    assert_eq!(answer, "shipped");
}

#[tokio::test]
async fn repeated_request_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("cached"))
        .expect(1)
        .mount(&server)
        .await;

    let ai = helper(&server);
    for _ in 0..3 {
        let answer = ai
            .parse(&settings(), "same content", Some("Tag: {content}"), Some("m1"))
            .await
            .expect("parse");
        assert_eq!(answer, "cached");
    }
}

#[tokio::test]
async fn different_model_misses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("fresh"))
        .expect(2)
        .mount(&server)
        .await;

    let ai = helper(&server);
    ai.parse(&settings(), "content", None, Some("m1"))
        .await
        .expect("first");
    ai.parse(&settings(), "content", None, Some("m2"))
        .await
        .expect("second");
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("third time"))
        .expect(1)
        .mount(&server)
        .await;

    let answer = helper(&server)
        .parse(&settings(), "content", None, None)
        .await
        .expect("parse");
    assert_eq!(answer, "third time");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = helper(&server)
        .parse(&settings(), "content", None, None)
        .await
        .expect_err("unauthorized");
    assert!(matches!(err, AiError::Status { status: 401, ref body } if body == "bad key"));
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = helper(&server)
        .parse(&settings(), "content", None, None)
        .await
        .expect_err("empty");
    assert!(matches!(err, AiError::EmptyResponse));
}

#[tokio::test]
async fn models_are_listed_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"id": "Qwen/Qwen2.5-7B-Instruct"}, {"id": "deepseek-ai/DeepSeek-V3"}]
        })))
        .mount(&server)
        .await;

    let models = helper(&server)
        .list_models(&settings())
        .await
        .expect("models");
    assert_eq!(
        models,
        vec![
            "Qwen/Qwen2.5-7B-Instruct".to_string(),
            "deepseek-ai/DeepSeek-V3".to_string()
        ]
    );
}

#[tokio::test]
async fn missing_key_never_calls_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let err = helper(&server)
        .parse(&SiliconFlowConfig::default(), "content", None, None)
        .await
        .expect_err("not configured");
    assert!(matches!(err, AiError::NotConfigured));
}

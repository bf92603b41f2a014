use itech_assistant::assistant::{InteractionController, InteractionState, Outcome, SYSTEM_INSTRUCTION};
use itech_assistant::{Credentials, ModelClientFactory, ModelSettings};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY_PATH: &str = "/v1beta/models/gemini-1.5-pro:streamGenerateContent";

/// Load test fixture from file
fn load_fixture(filename: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/gemini/{filename}"))
        .unwrap_or_else(|_| panic!("Failed to load test fixture: {filename}"))
}

fn sse(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/event-stream")
}

fn settings() -> ModelSettings {
    ModelSettings {
        retry_backoff: Duration::ZERO,
        ..ModelSettings::default()
    }
}

fn controller(credentials: Credentials, server: &MockServer) -> InteractionController {
    let factory = ModelClientFactory::new(settings(), Some(credentials)).with_base_url(server.uri());
    InteractionController::new(Arc::new(factory))
}

fn api_key_controller(server: &MockServer) -> InteractionController {
    controller(Credentials::ApiKey("test-key".to_string()), server)
}

#[tokio::test]
async fn test_question_round_trip() {
    let mock_server = MockServer::start().await;

    let expected_payload = json!({
        "contents": [
            {"role": "user", "parts": [{"text": "Question: What is 2+2?"}]}
        ],
        "systemInstruction": {"parts": [{"text": SYSTEM_INSTRUCTION}]},
        "generationConfig": {"temperature": 0.0}
    });

    Mock::given(method("POST"))
        .and(path(API_KEY_PATH))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_json(expected_payload))
        .respond_with(sse(load_fixture("answer.sse")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = api_key_controller(&mock_server)
        .run("What is 2+2?")
        .await
        .unwrap();

    assert_eq!(
        state,
        InteractionState::Settled(Outcome::Response("2 + 2 = **4**".to_string()))
    );
}

#[tokio::test]
async fn test_crlf_framed_stream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_KEY_PATH))
        .respond_with(sse(load_fixture("answer_crlf.sse")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = api_key_controller(&mock_server).run("What is 2+2?").await.unwrap();
    assert_eq!(state, InteractionState::Settled(Outcome::Response("4".to_string())));
}

#[tokio::test]
async fn test_empty_question_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(sse(load_fixture("answer.sse")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let state = api_key_controller(&mock_server).run("").await.unwrap();
    assert_eq!(state, InteractionState::Idle);
}

#[tokio::test]
async fn test_server_errors_are_retried_twice() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_KEY_PATH))
        .respond_with(
            ResponseTemplate::new(503).set_body_string(load_fixture("error_unavailable.json")),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let state = api_key_controller(&mock_server).run("hello").await.unwrap();

    match state {
        InteractionState::Settled(Outcome::Failure(message)) => {
            assert!(message.starts_with("An error occurred: "));
            assert!(message.contains("The model is overloaded"));
        }
        other => panic!("Expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_recovers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_KEY_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(API_KEY_PATH))
        .respond_with(sse(load_fixture("answer_crlf.sse")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = api_key_controller(&mock_server).run("What is 2+2?").await.unwrap();
    assert_eq!(state, InteractionState::Settled(Outcome::Response("4".to_string())));
}

#[tokio::test]
async fn test_invalid_key_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_KEY_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = api_key_controller(&mock_server).run("hello").await.unwrap();
    assert_eq!(
        state,
        InteractionState::Settled(Outcome::Failure(
            "An error occurred: Invalid request: API key not valid. Please pass a valid API key."
                .to_string()
        ))
    );
}

#[tokio::test]
async fn test_vertex_access_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/projects/test-project/locations/europe-west1/publishers/google/models/gemini-1.5-pro:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(sse(load_fixture("answer.sse")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = Credentials::VertexToken {
        project_id: "test-project".to_string(),
        location: "europe-west1".to_string(),
        access_token: "test-access-token".to_string(),
    };
    let state = controller(credentials, &mock_server)
        .run("What is 2+2?")
        .await
        .unwrap();

    assert_eq!(
        state,
        InteractionState::Settled(Outcome::Response("2 + 2 = **4**".to_string()))
    );
}

#[tokio::test]
async fn test_blocked_prompt_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_KEY_PATH))
        .respond_with(sse(
            "data: {\"promptFeedback\":{\"blockReason\":\"SAFETY\"}}\n\n".to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = api_key_controller(&mock_server).run("hello").await.unwrap();
    assert_eq!(
        state,
        InteractionState::Settled(Outcome::Failure(
            "An error occurred: Prompt blocked: SAFETY".to_string()
        ))
    );
}

#[tokio::test]
async fn test_malformed_chunk_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_KEY_PATH))
        .respond_with(sse("data: {\"candidates\": [\n\n".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = api_key_controller(&mock_server).run("hello").await.unwrap();
    match state {
        InteractionState::Settled(Outcome::Failure(message)) => {
            assert!(message.starts_with("An error occurred: Serialization error:"));
        }
        other => panic!("Expected failure, got {other:?}"),
    }
}

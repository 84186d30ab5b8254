//! Gemini client integration tests.
//!
//! Drives the blocking client against a local `wiremock` server:
//! - Request shape (path, API key header, body)
//! - Response decoding and part concatenation
//! - Mapping of HTTP, timeout, transport and safety failures to `UpstreamError`
//! - Gateway fallback answers over a real HTTP round trip
//!
//! The blocking client owns its own runtime, so every client is built, used and
//! dropped inside `spawn_blocking`.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use folio::llm::{GeminiClient, LlmHttpConfig, LlmProvider, REFUSAL_SENTENCE, UpstreamError};
use folio::models::ContentItem;
use folio::services::{ContentStore, QaGateway, UNAVAILABLE_FALLBACK};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new()
        .with_api_key("test-key")
        .with_base_url(base_url)
        .with_model("gemini-2.5-flash")
}

async fn run_blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

fn text_response(parts: &[&str]) -> serde_json::Value {
    let parts: Vec<_> = parts.iter().map(|text| json!({ "text": text })).collect();
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }]
    })
}

mod gemini_client {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sends_prompt_with_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(text_response(&["Hi ", "there"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = run_blocking(move || client(&uri).generate("hello")).await;
        assert_eq!(result.as_deref(), Ok("Hi there"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_server_error_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = run_blocking(move || client(&uri).generate("hello")).await;
        assert_eq!(
            result,
            Err(UpstreamError::Status {
                status: 500,
                body: "internal".to_string()
            })
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_quota_exhaustion_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = run_blocking(move || client(&uri).generate("hello")).await;
        assert!(matches!(result, Err(UpstreamError::Status { status: 429, .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_json_maps_to_decode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = run_blocking(move || client(&uri).generate("hello")).await;
        assert!(matches!(result, Err(UpstreamError::Decode(_))), "{result:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocked_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
            )
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = run_blocking(move || client(&uri).generate("hello")).await;
        assert_eq!(result, Err(UpstreamError::Blocked("SAFETY".to_string())));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&[""])))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = run_blocking(move || client(&uri).generate("hello")).await;
        assert_eq!(result, Err(UpstreamError::Empty));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_response(&["late"]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = run_blocking(move || {
            client(&uri)
                .with_http_config(LlmHttpConfig {
                    timeout_ms: 200,
                    connect_timeout_ms: 200,
                })
                .generate("hello")
        })
        .await;
        assert!(matches!(result, Err(UpstreamError::Timeout(_))), "{result:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreachable_host_maps_to_transport() {
        let result = run_blocking(|| client("http://127.0.0.1:1").generate("hello")).await;
        assert!(matches!(result, Err(UpstreamError::Transport(_))), "{result:?}");
    }
}

mod gateway_round_trip {
    use super::*;

    fn gateway(base_url: &str) -> QaGateway {
        let store = ContentStore::from_items(vec![
            ContentItem::new("paper_x", "X")
                .with_description("Y")
                .with_tech_stack(["A", "B"])
                .with_details("Z"),
        ])
        .unwrap();
        QaGateway::new(Arc::new(store), Arc::new(client(base_url)))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_grounded_prompt_reaches_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(text_response(&[REFUSAL_SENTENCE])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let answer = run_blocking(move || gateway(&uri).answer("paper_x", "Who funded X?")).await;
        assert_eq!(answer.as_deref(), Ok(REFUSAL_SENTENCE));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Title: X\nDescription: Y\nTechnology Stack: A, B\n\nDetails: Z"));
        assert!(prompt.contains("USER QUESTION: Who funded X?"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upstream_outage_becomes_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend secret detail"))
            .mount(&server)
            .await;

        let uri = server.uri();
        let answer = run_blocking(move || gateway(&uri).answer("paper_x", "What is X?")).await;
        assert_eq!(answer.as_deref(), Ok(UNAVAILABLE_FALLBACK));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_validation_failure_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&["unused"])))
            .expect(0)
            .mount(&server)
            .await;

        let uri = server.uri();
        let answer = run_blocking(move || gateway(&uri).answer("paper_x", "Hi")).await;
        assert_eq!(answer, Err(folio::AskError::QueryTooShort));
    }
}

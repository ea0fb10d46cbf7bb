//! Integration tests for the Gemini extraction client
//!
//! These tests run against a local wiremock server; no real API key or
//! network access is needed.

use facturo_engine::config::GeminiConfig;
use facturo_engine::extraction::{
    ExtractionError, ExtractionRequest, Extractor, GeminiExtractor,
};
use facturo_engine::secrets::SecretString;
use sdk::capture::Artifact;
use sdk::types::{LineItem, Record};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn extractor(server: &MockServer) -> GeminiExtractor {
    let config = GeminiConfig {
        base_url: format!("{}/v1beta", server.uri()),
        model: "gemini-2.5-flash".to_string(),
    };
    GeminiExtractor::new(config, SecretString::new("test-key"), Duration::from_secs(5)).unwrap()
}

fn request(text: &str) -> ExtractionRequest {
    ExtractionRequest {
        artifact: Artifact::transcript(text),
        current_record: Record::default(),
        current_question: Some("¿Quién es el cliente?".to_string()),
    }
}

fn candidate(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_successful_extraction() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
            r#"{"party": {"name": "Acme", "id": "30-1"}, "lineItems": [{"description": "Bolt", "quantity": 10, "unitPrice": 2}], "complete": true}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let partial = extractor(&server)
        .extract(&request("Acme, diez tornillos a dos"))
        .await
        .unwrap();

    assert_eq!(partial.party.unwrap().name.as_deref(), Some("Acme"));
    assert_eq!(partial.line_items.unwrap(), vec![LineItem::new("Bolt", 10.0, 2.0)]);
    assert!(partial.complete);
}

#[tokio::test]
async fn test_key_not_sent_in_query_string() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("{}")))
        .mount(&server)
        .await;

    extractor(&server).extract(&request("hola")).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].url.query().is_none());
}

#[tokio::test]
async fn test_prompt_carries_question_and_transcript() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("¿Quién es el cliente?"))
        .and(body_string_contains("tres tornillos"))
        .and(body_string_contains("responseSchema"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("{}")))
        .expect(1)
        .mount(&server)
        .await;

    let partial = extractor(&server)
        .extract(&request("tres tornillos"))
        .await
        .unwrap();
    assert!(partial.is_empty());
}

#[tokio::test]
async fn test_status_mapping() {
    let cases = [
        (400, "invalid_request"),
        (401, "auth"),
        (403, "auth"),
        (404, "invalid_request"),
        (429, "rate_limit"),
        (500, "unavailable"),
        (503, "unavailable"),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = extractor(&server).extract(&request("x")).await.unwrap_err();
        let kind = match err {
            ExtractionError::InvalidRequest(_) => "invalid_request",
            ExtractionError::AuthenticationFailed(_) => "auth",
            ExtractionError::RateLimitExceeded => "rate_limit",
            ExtractionError::ProviderUnavailable(_) => "unavailable",
            other => panic!("unexpected error for {}: {:?}", status, other),
        };
        assert_eq!(kind, expected, "status {}", status);
    }
}

#[tokio::test]
async fn test_block_reason_is_blocked() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = extractor(&server).extract(&request("x")).await.unwrap_err();
    assert_eq!(err, ExtractionError::Blocked("SAFETY".to_string()));
}

#[tokio::test]
async fn test_unparseable_model_text_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("no tengo idea")))
        .mount(&server)
        .await;

    let err = extractor(&server).extract(&request("x")).await.unwrap_err();
    assert!(matches!(err, ExtractionError::Parse(_)));
}

#[tokio::test]
async fn test_sloppy_model_json_keeps_valid_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
            r#"{"party": {"name": "Acme", "id": "30-1"}, "lineItems": [{"description": "Bolt", "quantity": null, "unitPrice": 2}, "y dos tuercas"], "complete": "false"}"#,
        )))
        .mount(&server)
        .await;

    let partial = extractor(&server).extract(&request("x")).await.unwrap();

    let party = partial.party.unwrap();
    assert_eq!(party.name.as_deref(), Some("Acme"));
    assert_eq!(party.id.as_deref(), Some("30-1"));
    assert_eq!(partial.line_items.unwrap(), vec![LineItem::new("Bolt", 1.0, 2.0)]);
    assert!(!partial.complete);
}

#[tokio::test]
async fn test_fenced_json_is_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
            "```json\n{\"notes\": \"Pago contado\"}\n```",
        )))
        .mount(&server)
        .await;

    let partial = extractor(&server).extract(&request("x")).await.unwrap();
    assert_eq!(partial.notes.as_deref(), Some("Pago contado"));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(candidate("{}"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = GeminiConfig {
        base_url: format!("{}/v1beta", server.uri()),
        model: "gemini-2.5-flash".to_string(),
    };
    let extractor =
        GeminiExtractor::new(config, SecretString::new("k"), Duration::from_secs(1)).unwrap();

    let err = extractor.extract(&request("x")).await.unwrap_err();
    assert_eq!(err, ExtractionError::Timeout(1));
}

//! Script and speech clients against mock HTTP servers.

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adreel_pipeline::{
    CollaboratorError, GeminiConfig, GeminiScriptGenerator, HttpSpeechClient, ProductBrief,
    ScriptGenerator, SpeechConfig, TextToSpeech,
};

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ] } }
        ]
    })
}

fn gemini(server: &MockServer, models: &[&str]) -> GeminiScriptGenerator {
    let config = GeminiConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.uri(),
        models: models.iter().map(|m| m.to_string()).collect(),
        ..GeminiConfig::default()
    };
    GeminiScriptGenerator::new(&config)
        .unwrap()
        .with_retry_delay(Duration::from_millis(1))
}

fn speech(server: &MockServer) -> HttpSpeechClient {
    let config = SpeechConfig {
        api_key: Some("tts-key".to_string()),
        base_url: server.uri(),
        ..SpeechConfig::default()
    };
    HttpSpeechClient::new(&config)
        .unwrap()
        .with_retry_delay(Duration::from_millis(1))
}

#[tokio::test]
async fn script_is_parsed_from_fenced_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/model-a:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            "```json\n{\"script\": \"Meet Glow. Shine every day.\"}\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let brief = ProductBrief::new("Glow").with_audience("night owls");
    let script = gemini(&server, &["model-a"]).generate(&brief, 18.0).await.unwrap();
    assert_eq!(script, "Meet Glow. Shine every day.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("18-second"));
    assert!(prompt.contains("At most 45 spoken words"));
    assert!(prompt.contains("night owls"));
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
}

#[tokio::test]
async fn script_falls_back_to_next_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/model-a:generateContent"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/model-b:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("{\"script\": \"Hello.\"}")))
        .expect(1)
        .mount(&server)
        .await;

    let script = gemini(&server, &["model-a", "model-b"])
        .generate(&ProductBrief::new("Mug"), 10.0)
        .await
        .unwrap();
    assert_eq!(script, "Hello.");
}

#[tokio::test]
async fn script_retries_rate_limits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/model-a:generateContent"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/model-a:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("{\"script\": \"Hi.\"}")))
        .mount(&server)
        .await;

    let script = gemini(&server, &["model-a"])
        .generate(&ProductBrief::new("Mug"), 10.0)
        .await
        .unwrap();
    assert_eq!(script, "Hi.");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn script_reports_last_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key invalid"))
        .mount(&server)
        .await;

    let err = gemini(&server, &["model-a", "model-b"])
        .generate(&ProductBrief::new("Mug"), 10.0)
        .await
        .unwrap_err();
    assert!(matches!(err, CollaboratorError::Http { status: 403, .. }));
    // Auth errors are not retried, one call per model.
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn speech_is_written_to_disk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .and(header("authorization", "Bearer tts-key"))
        .and(body_partial_json(json!({
            "model": "tts-1",
            "voice": "alloy",
            "input": "Meet Glow."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 fake mp3".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("voiceover.mp3");
    let written = speech(&server).synthesize("Meet Glow.", &output).await.unwrap();

    assert_eq!(written, output);
    assert_eq!(std::fs::read(&output).unwrap(), b"ID3 fake mp3");
}

#[tokio::test]
async fn speech_auth_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("voiceover.mp3");
    let err = speech(&server).synthesize("Hello.", &output).await.unwrap_err();

    assert!(matches!(err, CollaboratorError::Http { status: 401, .. }));
    assert!(!output.exists());
}

#[tokio::test]
async fn speech_rejects_empty_audio_and_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("voiceover.mp3");
    let client = speech(&server);

    let err = client.synthesize("Hello.", &output).await.unwrap_err();
    assert!(matches!(err, CollaboratorError::InvalidResponse(_)));

    let err = client.synthesize("   ", &output).await.unwrap_err();
    assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
}

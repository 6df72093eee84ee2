//! Adapters against mock HTTP servers: submit, poll, download.

use std::time::Duration;

use adreel_models::{AspectRatio, ProviderKind};
use adreel_providers::{
    ClipProvider, ClipRequest, LumaProvider, ProviderError, ProviderSettings, ProvidersConfig,
    ReplicateProvider, RunwayProvider,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLIP_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42fake clip";

fn settings(kind: ProviderKind, server: &MockServer) -> ProviderSettings {
    ProvidersConfig::default()
        .settings(kind)
        .clone()
        .with_api_key("test-key")
        .with_base_url(server.uri())
        .with_poll_interval(Duration::from_millis(5))
}

fn request(dir: &TempDir) -> ClipRequest {
    ClipRequest::new(
        0,
        b"png-bytes".to_vec(),
        "image/png",
        "Opening shot: slow push in",
        AspectRatio::Portrait,
        dir.path().join("segment_00_raw.mp4"),
    )
}

async fn mount_download(server: &MockServer) -> String {
    Mock::given(method("GET"))
        .and(path("/files/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(CLIP_BYTES))
        .mount(server)
        .await;
    format!("{}/files/clip.mp4", server.uri())
}

async fn first_json_body(server: &MockServer, method_name: &str) -> Value {
    let requests = server.received_requests().await.unwrap();
    let submit = requests
        .iter()
        .find(|r| r.method.to_string() == method_name)
        .unwrap();
    serde_json::from_slice(&submit.body).unwrap()
}

#[tokio::test]
async fn runway_submits_polls_and_downloads() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let clip_url = mount_download(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/image_to_video"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("X-Runway-Version", "2024-11-06"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-1"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/tasks/task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-1", "status": "RUNNING"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/tasks/task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task-1",
            "status": "SUCCEEDED",
            "output": [clip_url]
        })))
        .mount(&server)
        .await;

    let provider = RunwayProvider::new(settings(ProviderKind::Runway, &server)).unwrap();
    let request = request(&dir);
    let clip = provider.generate(&request).await.unwrap();

    assert_eq!(clip.provider, ProviderKind::Runway);
    assert_eq!(clip.duration, 5.0);
    assert_eq!(tokio::fs::read(&clip.path).await.unwrap(), CLIP_BYTES);

    let body = first_json_body(&server, "POST").await;
    assert_eq!(body["ratio"], "720:1280");
    assert_eq!(body["duration"], 5);
    assert_eq!(body["promptText"], "Opening shot: slow push in");
    assert!(body["promptImage"].as_str().unwrap().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn runway_unauthorized_is_auth_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/image_to_video"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let provider = RunwayProvider::new(settings(ProviderKind::Runway, &server)).unwrap();
    let err = provider.generate(&request(&dir)).await.unwrap_err();
    assert!(matches!(err, ProviderError::Auth(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn runway_safety_failure_is_validation_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/image_to_video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-2"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/tasks/task-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task-2",
            "status": "FAILED",
            "failure": "Image flagged",
            "failureCode": "SAFETY.INPUT.IMAGE"
        })))
        .mount(&server)
        .await;

    let provider = RunwayProvider::new(settings(ProviderKind::Runway, &server)).unwrap();
    let err = provider.generate(&request(&dir)).await.unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));
}

#[tokio::test]
async fn luma_generation_completes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let clip_url = mount_download(&server).await;

    Mock::given(method("POST"))
        .and(path("/dream-machine/v1/generations"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "gen-1", "state": "queued"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dream-machine/v1/generations/gen-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "gen-1", "state": "dreaming"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dream-machine/v1/generations/gen-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-1",
            "state": "completed",
            "assets": {"video": clip_url}
        })))
        .mount(&server)
        .await;

    let provider = LumaProvider::new(settings(ProviderKind::Luma, &server)).unwrap();
    let clip = provider.generate(&request(&dir)).await.unwrap();

    assert_eq!(clip.provider, ProviderKind::Luma);
    assert!(clip.path.exists());

    let body = first_json_body(&server, "POST").await;
    assert_eq!(body["aspect_ratio"], "9:16");
    assert_eq!(body["duration"], "5s");
    assert_eq!(body["keyframes"]["frame0"]["type"], "image");
}

#[tokio::test]
async fn luma_failed_generation_is_transient() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/dream-machine/v1/generations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "gen-2", "state": "queued"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dream-machine/v1/generations/gen-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-2",
            "state": "failed",
            "failure_reason": "capacity"
        })))
        .mount(&server)
        .await;

    let provider = LumaProvider::new(settings(ProviderKind::Luma, &server)).unwrap();
    let err = provider.generate(&request(&dir)).await.unwrap_err();
    assert!(err.is_transient());
    assert!(err.to_string().contains("capacity"));
}

#[tokio::test]
async fn replicate_prediction_succeeds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let clip_url = mount_download(&server).await;

    let model = ProvidersConfig::default().replicate.model;
    Mock::given(method("POST"))
        .and(path(format!("/v1/models/{}/predictions", model)))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p-1", "status": "starting"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/predictions/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p-1",
            "status": "succeeded",
            "output": clip_url
        })))
        .mount(&server)
        .await;

    let provider = ReplicateProvider::new(settings(ProviderKind::Replicate, &server)).unwrap();
    let clip = provider.generate(&request(&dir)).await.unwrap();

    assert_eq!(clip.duration, 4.0);
    assert_eq!(provider.raw_clip_duration(), 4.0);
    assert_eq!(tokio::fs::read(&clip.path).await.unwrap(), CLIP_BYTES);
}

#[tokio::test]
async fn replicate_rate_limit_is_transient() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let model = ProvidersConfig::default().replicate.model;
    Mock::given(method("POST"))
        .and(path(format!("/v1/models/{}/predictions", model)))
        .respond_with(ResponseTemplate::new(429).set_body_string("throttled"))
        .mount(&server)
        .await;

    let provider = ReplicateProvider::new(settings(ProviderKind::Replicate, &server)).unwrap();
    let err = provider.generate(&request(&dir)).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transient(_)));
}

#[tokio::test]
async fn empty_download_is_rejected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/empty.mp4"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let model = ProvidersConfig::default().replicate.model;
    Mock::given(method("POST"))
        .and(path(format!("/v1/models/{}/predictions", model)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p-2", "status": "starting"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/predictions/p-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p-2",
            "status": "succeeded",
            "output": [format!("{}/files/empty.mp4", server.uri())]
        })))
        .mount(&server)
        .await;

    let provider = ReplicateProvider::new(settings(ProviderKind::Replicate, &server)).unwrap();
    let request = request(&dir);
    let err = provider.generate(&request).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
    assert!(!request.output_path.exists());
}

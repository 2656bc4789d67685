/// Integration tests for the detect-emotion HTTP surface
use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use moodlens_core::{Analysis, BoundingBox, Emotion, EmotionScores};
use moodlensd::config::DEFAULT_MAX_BODY_BYTES;
use moodlensd::engine::{Analyzer, EngineError};
use moodlensd::routes::{self, DetectResponse, NO_FACE_MESSAGE};
use moodlensd::AppState;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;

/// Analyzer that answers every request with a fixed outcome.
enum StubAnalyzer {
    Face(Emotion),
    NoFace,
    EngineDown,
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(&self, _image: RgbImage) -> Result<Analysis, EngineError> {
        match self {
            StubAnalyzer::Face(emotion) => Ok(Analysis::Detected {
                emotion: *emotion,
                scores: EmotionScores::default(),
                face: BoundingBox {
                    x: 4.0,
                    y: 4.0,
                    width: 8.0,
                    height: 8.0,
                    confidence: 0.97,
                    landmarks: None,
                },
            }),
            StubAnalyzer::NoFace => Ok(Analysis::NoFace),
            StubAnalyzer::EngineDown => Err(EngineError::ChannelClosed),
        }
    }
}

fn setup_test_server(analyzer: StubAnalyzer, origins: &[&str]) -> TestServer {
    setup_test_server_with_limit(analyzer, origins, DEFAULT_MAX_BODY_BYTES)
}

fn setup_test_server_with_limit(
    analyzer: StubAnalyzer,
    origins: &[&str],
    max_body_bytes: usize,
) -> TestServer {
    let origins: Vec<String> = origins.iter().map(|o| o.to_string()).collect();
    let app = routes::router(AppState::new(Arc::new(analyzer)), &origins, max_body_bytes);
    TestServer::new(app).unwrap()
}

fn jpeg_data_url() -> String {
    let img = RgbImage::from_pixel(16, 16, Rgb([180, 150, 120]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    format!("data:image/jpeg;base64,{}", STANDARD.encode(buf.into_inner()))
}

#[tokio::test]
async fn test_detected_face_returns_emotion() {
    let server = setup_test_server(StubAnalyzer::Face(Emotion::Happy), &["*"]);

    let response = server
        .post("/detect-emotion")
        .json(&json!({ "image": jpeg_data_url() }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body, json!({ "emotion": "happy" }));
}

#[tokio::test]
async fn test_every_label_round_trips_through_response() {
    for emotion in Emotion::ALL {
        let server = setup_test_server(StubAnalyzer::Face(emotion), &["*"]);
        let response = server
            .post("/detect-emotion")
            .json(&json!({ "image": jpeg_data_url() }))
            .await;
        let body: DetectResponse = response.json();
        assert_eq!(body, DetectResponse::detected(emotion));
    }
}

#[tokio::test]
async fn test_no_face_returns_null_emotion() {
    let server = setup_test_server(StubAnalyzer::NoFace, &["*"]);

    let response = server
        .post("/detect-emotion")
        .json(&json!({ "image": jpeg_data_url() }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["emotion"], Value::Null);
    assert_eq!(body["error"], NO_FACE_MESSAGE);
}

#[tokio::test]
async fn test_malformed_base64_returns_decode_error() {
    let server = setup_test_server(StubAnalyzer::Face(Emotion::Sad), &["*"]);

    let response = server
        .post("/detect-emotion")
        .json(&json!({ "image": "data:image/jpeg;base64,%%%not base64%%%" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["emotion"], Value::Null);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("base64"), "unexpected error: {message}");
}

#[tokio::test]
async fn test_undecodable_image_bytes_return_error() {
    let server = setup_test_server(StubAnalyzer::Face(Emotion::Sad), &["*"]);
    let url = format!("data:image/png;base64,{}", STANDARD.encode(b"definitely not a png"));

    let response = server
        .post("/detect-emotion")
        .json(&json!({ "image": url }))
        .await;

    let body: Value = response.json();
    assert_eq!(body["emotion"], Value::Null);
    assert!(body["error"].as_str().unwrap().contains("could not decode image"));
}

#[tokio::test]
async fn test_missing_image_field_returns_error() {
    let server = setup_test_server(StubAnalyzer::Face(Emotion::Sad), &["*"]);

    let response = server
        .post("/detect-emotion")
        .json(&json!({ "picture": jpeg_data_url() }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["emotion"], Value::Null);
    assert!(body["error"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn test_non_json_body_returns_error() {
    let server = setup_test_server(StubAnalyzer::Face(Emotion::Sad), &["*"]);

    let response = server.post("/detect-emotion").text("not json at all").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["emotion"], Value::Null);
    assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
}

#[tokio::test]
async fn test_oversized_body_returns_json_error() {
    let server = setup_test_server_with_limit(StubAnalyzer::Face(Emotion::Happy), &["*"], 1024);
    let image = format!("data:image/jpeg;base64,{}", "A".repeat(4096));

    let response = server
        .post("/detect-emotion")
        .json(&json!({ "image": image }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["emotion"], Value::Null);
    let message = body["error"].as_str().unwrap();
    assert!(
        message.starts_with("could not read request body"),
        "unexpected error: {message}"
    );
}

#[tokio::test]
async fn test_body_above_axum_default_is_accepted() {
    // 3 MiB is over axum's built-in 2 MiB cap but under ours.
    let server = setup_test_server(StubAnalyzer::Face(Emotion::Happy), &["*"]);
    let image = format!("data:image/jpeg;base64,{}", "A".repeat(3 * 1024 * 1024));

    let response = server
        .post("/detect-emotion")
        .json(&json!({ "image": image }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["emotion"], Value::Null);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("could not decode image"), "unexpected error: {message}");
}

#[tokio::test]
async fn test_engine_failure_returns_error() {
    let server = setup_test_server(StubAnalyzer::EngineDown, &["*"]);

    let response = server
        .post("/detect-emotion")
        .json(&json!({ "image": jpeg_data_url() }))
        .await;

    let body: Value = response.json();
    assert_eq!(body, json!({ "error": "engine thread exited", "emotion": null }));
}

#[tokio::test]
async fn test_genres_endpoint() {
    let server = setup_test_server(StubAnalyzer::NoFace, &["*"]);

    let response = server.get("/genres").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["genres"]["happy"], 35);
    assert_eq!(body["genres"]["neutral"], 10749);
    assert!(body["genres"].get("disgust").is_none());
}

#[tokio::test]
async fn test_healthz() {
    let server = setup_test_server(StubAnalyzer::NoFace, &["*"]);

    let response = server.get("/healthz").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let server = setup_test_server(StubAnalyzer::NoFace, &["http://localhost:5173"]);

    let response = server
        .get("/healthz")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("http://localhost:5173"),
        )
        .await;

    let allowed = response.headers().get("access-control-allow-origin");
    assert_eq!(allowed.and_then(|v| v.to_str().ok()), Some("http://localhost:5173"));
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let server = setup_test_server(StubAnalyzer::NoFace, &["http://localhost:5173"]);

    let response = server
        .get("/healthz")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://evil.example.com"),
        )
        .await;

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_cors_wildcard() {
    let server = setup_test_server(StubAnalyzer::NoFace, &["*"]);

    let response = server
        .get("/healthz")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://anywhere.example.com"),
        )
        .await;

    let allowed = response.headers().get("access-control-allow-origin");
    assert_eq!(allowed.and_then(|v| v.to_str().ok()), Some("*"));
}

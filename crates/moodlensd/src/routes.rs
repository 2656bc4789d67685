//! HTTP surface: `POST /detect-emotion`, plus health and genre lookups.

use crate::engine::EngineError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use moodlens_core::{Analysis, DecodeError, Emotion};
pub use moodlens_core::NO_FACE_MESSAGE;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// Data URL, e.g. `data:image/jpeg;base64,...`.
    pub image: String,
}

/// Response body; `emotion` is always present, `error` only on failure.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DetectResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub emotion: Option<Emotion>,
}

impl DetectResponse {
    pub fn detected(emotion: Emotion) -> Self {
        Self { error: None, emotion: Some(emotion) }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), emotion: None }
    }
}

/// Every way a detect request can fail. All of them render as a 200 with
/// `{"error": ..., "emotion": null}`.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("could not read request body: {0}")]
    Body(#[from] BytesRejection),
    #[error("invalid request body: {0}")]
    InvalidRequest(#[from] serde_json::Error),
    #[error("{0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("image decoding task failed: {0}")]
    DecodeTask(#[from] tokio::task::JoinError),
    #[error("{}", NO_FACE_MESSAGE)]
    NoFace,
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        match &self {
            DetectError::NoFace => tracing::info!("no face in submitted image"),
            other => tracing::error!(error = %other, "emotion detection failed"),
        }
        (StatusCode::OK, Json(DetectResponse::failed(self.to_string()))).into_response()
    }
}

/// Decode the submitted frame and return the dominant emotion.
pub async fn detect_emotion(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<DetectResponse>, DetectError> {
    let request: DetectRequest = serde_json::from_slice(&body?)?;
    // base64 + image decoding is CPU-bound; keep it off the async workers.
    let image =
        tokio::task::spawn_blocking(move || moodlens_core::decode_data_url(&request.image)).await??;

    match state.analyzer().analyze(image).await? {
        Analysis::NoFace => Err(DetectError::NoFace),
        Analysis::Detected { emotion, face, .. } => {
            tracing::info!(%emotion, confidence = face.confidence, "detected emotion");
            Ok(Json(DetectResponse::detected(emotion)))
        }
    }
}

/// Static emotion → genre id map.
pub async fn genres() -> impl IntoResponse {
    let genres: BTreeMap<&'static str, u32> = Emotion::genre_map()
        .into_iter()
        .map(|(emotion, id)| (emotion.as_str(), id))
        .collect();
    Json(json!({ "genres": genres }))
}

/// Health check endpoint.
pub async fn healthz() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "moodlensd"
    }))
}

/// CORS layer for the given origins; `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring unparsable CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(origins)
    }
}

/// Build the API router.
///
/// `max_body_bytes` caps request bodies; oversized detect requests still get
/// the JSON error shape.
pub fn router(state: AppState, allowed_origins: &[String], max_body_bytes: usize) -> Router {
    Router::new()
        .route("/detect-emotion", post(detect_emotion))
        .route("/genres", get(genres))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_body_has_no_error_key() {
        let body = serde_json::to_value(DetectResponse::detected(Emotion::Happy)).unwrap();
        assert_eq!(body, json!({ "emotion": "happy" }));
    }

    #[test]
    fn test_failure_body_has_null_emotion() {
        let body = serde_json::to_value(DetectResponse::failed("boom")).unwrap();
        assert_eq!(body, json!({ "error": "boom", "emotion": null }));
    }

    #[test]
    fn test_no_face_message() {
        assert_eq!(DetectError::NoFace.to_string(), NO_FACE_MESSAGE);
    }
}

//! moodlens-core — Face detection and emotion classification engine.
//!
//! Uses SCRFD for face detection and FER+ for emotion classification,
//! both running via ONNX Runtime for CPU inference.

pub mod alignment;
pub mod classifier;
pub mod decode;
pub mod detector;
pub mod pipeline;
pub mod types;

pub use classifier::EmotionClassifier;
pub use decode::{decode_data_url, DecodeError};
pub use detector::FaceDetector;
pub use pipeline::{Classifier, Detector, Pipeline, PipelineError};
pub use types::{Analysis, BoundingBox, Emotion, EmotionScores, NO_FACE_MESSAGE};

use std::path::PathBuf;

/// Default SCRFD model file name.
pub const DEFAULT_DETECTOR_MODEL: &str = "det_10g.onnx";
/// Default FER+ model file name.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "emotion-ferplus-8.onnx";

/// `$XDG_DATA_HOME/moodlens/models`, falling back to `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("moodlens")
        .join("models")
}

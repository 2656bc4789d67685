//! FER+ emotion classifier via ONNX Runtime.
//!
//! Takes a 64×64 grayscale face crop and produces eight emotion logits, which
//! are softmaxed into [`EmotionScores`].

use crate::types::EmotionScores;
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

/// Side length of the square grayscale input expected by FER+.
pub const FERPLUS_INPUT_SIZE: u32 = 64;
const FERPLUS_NUM_CLASSES: usize = 8;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0} — download emotion-ferplus-8.onnx from the ONNX model zoo and place it in the model dir")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("expected a 64x64 face crop, got {0}x{1}")]
    BadCropSize(u32, u32),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// FER+ emotion classifier.
pub struct EmotionClassifier {
    session: Session,
}

impl EmotionClassifier {
    /// Load the FER+ ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, ClassifierError> {
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(1)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded FER+ model"
        );

        Ok(Self { session })
    }

    /// Classify an aligned face crop.
    pub fn classify(&mut self, face: &GrayImage) -> Result<EmotionScores, ClassifierError> {
        let input = preprocess(face)?;

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("emotion logits: {e}")))?;

        let scores = EmotionScores::from_logits(logits).ok_or_else(|| {
            ClassifierError::InferenceFailed(format!(
                "expected {FERPLUS_NUM_CLASSES} logits, got {}",
                logits.len()
            ))
        })?;

        tracing::debug!(?scores, "FER+ classification complete");
        Ok(scores)
    }
}

/// Pack a 64×64 crop into a `[1, 1, 64, 64]` tensor of raw pixel values.
///
/// FER+ was trained on unnormalized 0–255 intensities.
fn preprocess(face: &GrayImage) -> Result<Array4<f32>, ClassifierError> {
    let (w, h) = face.dimensions();
    if w != FERPLUS_INPUT_SIZE || h != FERPLUS_INPUT_SIZE {
        return Err(ClassifierError::BadCropSize(w, h));
    }

    let size = FERPLUS_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 1, size, size));
    for (x, y, pixel) in face.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = pixel.0[0] as f32;
    }
    Ok(tensor)
}

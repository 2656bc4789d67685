//! Detect → crop → classify.

use crate::alignment;
use crate::classifier::{ClassifierError, EmotionClassifier, FERPLUS_INPUT_SIZE};
use crate::detector::{DetectorError, FaceDetector};
use crate::types::{Analysis, BoundingBox, EmotionScores};
use image::{imageops, GrayImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Finds faces in a frame, most confident first.
pub trait Detector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError>;
}

/// Scores a 64x64 grayscale face crop.
pub trait Classifier {
    fn classify(&mut self, face: &GrayImage) -> Result<EmotionScores, ClassifierError>;
}

impl Detector for FaceDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
        FaceDetector::detect(self, image)
    }
}

impl Classifier for EmotionClassifier {
    fn classify(&mut self, face: &GrayImage) -> Result<EmotionScores, ClassifierError> {
        EmotionClassifier::classify(self, face)
    }
}

/// Face detector and emotion classifier, loaded together.
pub struct Pipeline<D = FaceDetector, C = EmotionClassifier> {
    detector: D,
    classifier: C,
}

impl Pipeline {
    pub fn load(detector_path: &str, classifier_path: &str) -> Result<Self, PipelineError> {
        let detector = FaceDetector::load(detector_path)?;
        let classifier = EmotionClassifier::load(classifier_path)?;
        Ok(Self::new(detector, classifier))
    }
}

impl<D: Detector, C: Classifier> Pipeline<D, C> {
    pub fn new(detector: D, classifier: C) -> Self {
        Self { detector, classifier }
    }

    /// Run the full analysis on one image.
    ///
    /// Returns [`Analysis::NoFace`] without touching the classifier when the
    /// detector finds nothing. Only the most confident face is classified.
    pub fn analyze(&mut self, image: &RgbImage) -> Result<Analysis, PipelineError> {
        let faces = self.detector.detect(image)?;
        let Some(face) = faces.into_iter().next() else {
            tracing::debug!("no face detected");
            return Ok(Analysis::NoFace);
        };

        let gray = imageops::grayscale(image);
        let crop = alignment::face_crop(&gray, &face, FERPLUS_INPUT_SIZE);
        let scores = self.classifier.classify(&crop)?;
        let emotion = scores.dominant();

        tracing::debug!(
            %emotion,
            confidence = face.confidence,
            aligned = face.landmarks.is_some(),
            "face classified"
        );

        Ok(Analysis::Detected { emotion, scores, face })
    }
}

//! One-call face analysis: detection plus embedding extraction.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Face;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Face detector and recognizer bundled behind a single call.
///
/// Both models are loaded up front so a missing or broken model file fails at
/// startup, not on the first request.
pub struct FaceAnalyzer {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl FaceAnalyzer {
    /// Load both ONNX models.
    pub fn open(detector_path: &str, recognizer_path: &str) -> Result<Self, AnalyzeError> {
        let detector = FaceDetector::load(detector_path)?;
        tracing::info!(path = detector_path, "SCRFD detector loaded");

        let recognizer = FaceRecognizer::load(recognizer_path)?;
        tracing::info!(path = recognizer_path, "ArcFace recognizer loaded");

        Ok(Self { detector, recognizer })
    }

    /// Detect every face in the image and extract an embedding for each.
    ///
    /// Faces come back in the detector's confidence-descending order, so
    /// `.first()` is the best face.
    pub fn analyze(&mut self, image: &RgbImage) -> Result<Vec<Face>, AnalyzeError> {
        let boxes = self.detector.detect(image)?;

        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let embedding = self.recognizer.extract(image, &bbox)?;
            faces.push(Face { bbox, embedding });
        }

        tracing::debug!(faces = faces.len(), "image analyzed");
        Ok(faces)
    }
}

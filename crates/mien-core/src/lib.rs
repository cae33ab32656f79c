//! Face analysis pipeline for the Mien web front-end.
//!
//! Uses SCRFD for face detection and ArcFace for face embeddings, both running
//! via ONNX Runtime for CPU inference, plus the matching and annotation logic
//! shared by the daemon and the CLI.

use std::path::PathBuf;

pub mod alignment;
pub mod analyzer;
pub mod annotate;
pub mod detector;
pub mod recognizer;
pub mod types;

pub use analyzer::{AnalyzeError, FaceAnalyzer};
pub use detector::FaceDetector;
pub use recognizer::FaceRecognizer;
pub use types::{
    BoundingBox, CosineMatcher, Embedding, Face, MatchOutcome, Matcher, Person, UNKNOWN_LABEL,
};

/// File name of the SCRFD detection model inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";

/// Version tag of the SCRFD detection model.
pub const SCRFD_MODEL_VERSION: &str = "det_10g";

/// File name of the ArcFace recognition model inside the model directory.
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

/// Version tag of the ArcFace recognition model, recorded on every embedding
/// it produces.
pub const ARCFACE_MODEL_VERSION: &str = "w600k_r50";

/// Default directory searched for the ONNX model files.
///
/// Overridable via `MIEN_MODEL_DIR`; relative to the working directory so a
/// checkout with a `models/` folder next to the binary just works.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_files_carry_their_version_tags() {
        assert_eq!(SCRFD_MODEL_FILE, format!("{SCRFD_MODEL_VERSION}.onnx"));
        assert_eq!(ARCFACE_MODEL_FILE, format!("{ARCFACE_MODEL_VERSION}.onnx"));
    }
}

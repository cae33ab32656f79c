use ab_glyph::FontArc;
use image::RgbImage;
use mien_core::annotate::{self, Annotation};
use mien_core::{
    AnalyzeError, CosineMatcher, Embedding, FaceAnalyzer, Matcher, Person, UNKNOWN_LABEL,
};
use std::path::Path;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("analysis failed: {0}")]
    Analyze(#[from] AnalyzeError),
    #[error("no face detected in the uploaded image")]
    NoFaceDetected,
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Result of an enrollment analysis.
pub struct EnrollOutcome {
    pub embedding: Embedding,
    /// Detection confidence of the stored face.
    pub confidence: f32,
    /// How many faces the upload contained (only the best one is stored).
    pub faces_found: usize,
}

/// One face in a recognition result.
#[derive(Debug, Clone)]
pub struct RecognizedFace {
    /// Matched name; `None` when the best similarity is not above threshold.
    pub name: Option<String>,
    pub similarity: f32,
}

/// Result of a recognition analysis.
pub struct RecognizeOutcome {
    pub faces: Vec<RecognizedFace>,
    /// Annotated copy of the upload, JPEG-encoded.
    pub image_jpeg: Vec<u8>,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Enroll {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<EnrollOutcome, EngineError>>,
    },
    Recognize {
        image: Vec<u8>,
        gallery: Vec<Person>,
        threshold: f32,
        reply: oneshot::Sender<Result<RecognizeOutcome, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Request enrollment: decode the upload, detect the best face, extract
    /// its embedding.
    pub async fn enroll(&self, image: Vec<u8>) -> Result<EnrollOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Enroll {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Request recognition: decode the upload, match every detected face
    /// against the gallery snapshot, return labels and the annotated image.
    pub async fn recognize(
        &self,
        image: Vec<u8>,
        gallery: Vec<Person>,
        threshold: f32,
    ) -> Result<RecognizeOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Recognize {
                image,
                gallery,
                threshold,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

#[cfg(test)]
impl EngineHandle {
    /// Handle whose engine thread has already exited.
    pub(crate) fn disconnected() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Loads both ONNX models and the label font before the thread starts, then
/// enters a request loop. ONNX inference stays off the async runtime. Fails
/// fast at startup if a model is unavailable.
pub fn spawn_engine(
    scrfd_path: &str,
    arcface_path: &str,
    label_font: Option<&Path>,
) -> Result<EngineHandle, EngineError> {
    let mut analyzer = FaceAnalyzer::open(scrfd_path, arcface_path)?;
    let font = annotate::load_label_font(label_font);

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("mien-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Enroll { image, reply } => {
                        let _ = reply.send(run_enroll(&mut analyzer, &image));
                    }
                    EngineRequest::Recognize {
                        image,
                        gallery,
                        threshold,
                        reply,
                    } => {
                        let result =
                            run_recognize(&mut analyzer, font.as_ref(), &image, &gallery, threshold);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { tx })
}

fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, EngineError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Decode the upload, pick the best face (highest confidence), extract its
/// embedding.
fn run_enroll(analyzer: &mut FaceAnalyzer, image: &[u8]) -> Result<EnrollOutcome, EngineError> {
    let decoded = decode_rgb(image)?;
    let faces = analyzer.analyze(&decoded)?;
    let faces_found = faces.len();

    // analyze() orders by confidence, so the first face is the best one.
    let best = faces.into_iter().next().ok_or(EngineError::NoFaceDetected)?;

    tracing::info!(
        confidence = best.bbox.confidence,
        faces_found,
        "enroll: best face selected"
    );

    Ok(EnrollOutcome {
        embedding: best.embedding,
        confidence: best.bbox.confidence,
        faces_found,
    })
}

/// Decode the upload, match every face against the gallery, annotate the
/// image. Zero faces is a success with an empty list; the page still shows
/// the photo.
fn run_recognize(
    analyzer: &mut FaceAnalyzer,
    font: Option<&FontArc>,
    image: &[u8],
    gallery: &[Person],
    threshold: f32,
) -> Result<RecognizeOutcome, EngineError> {
    let mut decoded = decode_rgb(image)?;
    let analyzed = analyzer.analyze(&decoded)?;

    let matcher = CosineMatcher;
    let mut faces = Vec::with_capacity(analyzed.len());
    let mut annotations = Vec::with_capacity(analyzed.len());

    for face in analyzed {
        let outcome = matcher.compare(&face.embedding, gallery, threshold);
        let label = outcome
            .name
            .clone()
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        annotations.push(Annotation {
            bbox: face.bbox,
            label,
        });
        faces.push(RecognizedFace {
            name: outcome.name,
            similarity: outcome.similarity,
        });
    }

    annotate::draw_annotations(&mut decoded, &annotations, font);
    let image_jpeg = annotate::encode_jpeg(&decoded)?;

    tracing::info!(
        faces = faces.len(),
        matched = faces.iter().filter(|f| f.name.is_some()).count(),
        "recognize: image processed"
    );

    Ok(RecognizeOutcome { faces, image_jpeg })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_fail_once_the_engine_is_gone() {
        let handle = EngineHandle::disconnected();

        let result = handle.enroll(vec![0u8; 4]).await;
        assert!(matches!(result, Err(EngineError::ChannelClosed)));

        let result = handle.recognize(vec![0u8; 4], Vec::new(), 0.4).await;
        assert!(matches!(result, Err(EngineError::ChannelClosed)));
    }
}

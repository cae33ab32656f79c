use serde::{Deserialize, Serialize};

/// Display label for a face whose best similarity is not above the threshold.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (typically 512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. Zero-norm inputs
    /// yield 0.0 rather than NaN.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One analyzed face: where it is and what it looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// One enrolled gallery entry.
///
/// The gallery is a `Vec<Person>` ordered by first enrollment; re-enrolling a
/// name replaces the embedding in place and keeps the position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub embedding: Embedding,
    /// RFC 3339 timestamp of the most recent enrollment.
    pub enrolled_at: String,
}

/// Result of matching a probe embedding against the gallery.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Cosine similarity of the best gallery entry [-1, 1], 0.0 when empty.
    pub similarity: f32,
    /// Name of the matched person (only when `matched`).
    pub name: Option<String>,
}

/// Strategy for comparing a probe embedding against the enrolled gallery.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, gallery: &[Person], threshold: f32) -> MatchOutcome;
}

/// Cosine-similarity nearest-neighbor matcher.
///
/// Scans the whole gallery in order. The running best is only displaced by a
/// strictly greater similarity, so on an exact tie the earliest-enrolled entry
/// wins. A match requires the best similarity to be strictly above the
/// threshold; at or below it the face is unknown.
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[Person], threshold: f32) -> MatchOutcome {
        let mut best_sim = f32::NEG_INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, person) in gallery.iter().enumerate() {
            let sim = probe.similarity(&person.embedding);
            if sim > best_sim {
                best_sim = sim;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_sim > threshold => MatchOutcome {
                matched: true,
                similarity: best_sim,
                name: Some(gallery[idx].name.clone()),
            },
            _ => MatchOutcome {
                matched: false,
                similarity: if best_sim == f32::NEG_INFINITY { 0.0 } else { best_sim },
                name: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: Vec<f32>) -> Embedding {
        Embedding { values, model_version: None }
    }

    fn person(name: &str, values: Vec<f32>) -> Person {
        Person {
            name: name.into(),
            embedding: emb(values),
            enrolled_at: String::new(),
        }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = emb(vec![1.0, 0.0, 0.0]);
        let b = emb(vec![1.0, 0.0, 0.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = emb(vec![1.0, 0.0]);
        let b = emb(vec![0.0, 1.0]);
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = emb(vec![1.0, 0.0]);
        let b = emb(vec![-1.0, 0.0]);
        assert!((a.similarity(&b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = emb(vec![0.0, 0.0]);
        let b = emb(vec![1.0, 0.0]);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = emb(vec![0.0, 0.0]);
        let b = emb(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_scans_whole_gallery() {
        // Best match is the last entry; the scan must reach it.
        let probe = emb(vec![1.0, 0.0, 0.0]);
        let gallery = vec![
            person("decoy1", vec![0.0, 1.0, 0.0]),
            person("decoy2", vec![0.0, 0.0, 1.0]),
            person("match", vec![1.0, 0.0, 0.0]),
        ];

        let result = CosineMatcher.compare(&probe, &gallery, 0.4);
        assert!(result.matched);
        assert_eq!(result.name.as_deref(), Some("match"));
        assert!((result.similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_below_threshold() {
        let probe = emb(vec![1.0, 0.0, 0.0]);
        let gallery = vec![person("other", vec![0.0, 1.0, 0.0])];

        let result = CosineMatcher.compare(&probe, &gallery, 0.4);
        assert!(!result.matched);
        assert!(result.name.is_none());
        assert!(result.similarity.abs() < 1e-6);
    }

    #[test]
    fn test_matcher_threshold_is_strict() {
        // similarity == threshold must NOT match ("above 0.4", not "at least").
        let probe = emb(vec![1.0, 0.0]);
        let gallery = vec![person("edge", vec![1.0, 0.0])];

        let result = CosineMatcher.compare(&probe, &gallery, 1.0);
        assert!(!result.matched);
        assert!((result.similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_tie_keeps_earliest() {
        // Two identical entries: the one enrolled first wins the tie.
        let probe = emb(vec![1.0, 0.0]);
        let gallery = vec![
            person("first", vec![1.0, 0.0]),
            person("second", vec![1.0, 0.0]),
        ];

        let result = CosineMatcher.compare(&probe, &gallery, 0.4);
        assert!(result.matched);
        assert_eq!(result.name.as_deref(), Some("first"));
    }

    #[test]
    fn test_matcher_empty_gallery() {
        let probe = emb(vec![1.0, 0.0]);
        let result = CosineMatcher.compare(&probe, &[], 0.4);
        assert!(!result.matched);
        assert!(result.name.is_none());
        assert_eq!(result.similarity, 0.0);
    }
}

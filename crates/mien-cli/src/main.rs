use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mien_core::annotate::{self, Annotation};
use mien_core::{Face, FaceAnalyzer};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mien", about = "Mien face analysis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect faces in an image
    Detect {
        /// Image file to analyze
        image: PathBuf,
        /// Write an annotated copy of the image here
        #[arg(long)]
        annotate: Option<PathBuf>,
        /// Print detections as JSON
        #[arg(long)]
        json: bool,
        /// Directory containing the ONNX model files
        #[arg(long, default_value_os_t = mien_core::default_model_dir())]
        model_dir: PathBuf,
    },
    /// Compare the best face in two images
    Compare {
        /// First image
        a: PathBuf,
        /// Second image
        b: PathBuf,
        /// Cosine similarity a match must strictly exceed
        #[arg(long, default_value_t = 0.4)]
        threshold: f32,
        /// Directory containing the ONNX model files
        #[arg(long, default_value_os_t = mien_core::default_model_dir())]
        model_dir: PathBuf,
    },
    /// Check that the model files are present
    Models {
        /// Directory containing the ONNX model files
        #[arg(long, default_value_os_t = mien_core::default_model_dir())]
        model_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            image,
            annotate,
            json,
            model_dir,
        } => cmd_detect(&image, annotate.as_deref(), json, &model_dir),
        Commands::Compare {
            a,
            b,
            threshold,
            model_dir,
        } => cmd_compare(&a, &b, threshold, &model_dir),
        Commands::Models { model_dir } => cmd_models(&model_dir),
    }
}

fn open_analyzer(model_dir: &Path) -> Result<FaceAnalyzer> {
    let detector = model_dir.join(mien_core::SCRFD_MODEL_FILE);
    let recognizer = model_dir.join(mien_core::ARCFACE_MODEL_FILE);
    FaceAnalyzer::open(
        detector.to_string_lossy().as_ref(),
        recognizer.to_string_lossy().as_ref(),
    )
    .context("failed to load models (see `mien models`)")
}

fn load_rgb(path: &Path) -> Result<image::RgbImage> {
    Ok(image::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .to_rgb8())
}

fn cmd_detect(
    image_path: &Path,
    annotate_out: Option<&Path>,
    json: bool,
    model_dir: &Path,
) -> Result<()> {
    let mut analyzer = open_analyzer(model_dir)?;
    let image = load_rgb(image_path)?;
    let faces = analyzer.analyze(&image)?;

    if json {
        let entries: Vec<_> = faces.iter().map(face_json).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{} face(s) detected", faces.len());
        for (i, face) in faces.iter().enumerate() {
            let b = &face.bbox;
            println!(
                "  face {i}: at ({:.0}, {:.0}) size {:.0}x{:.0} confidence {:.3}",
                b.x, b.y, b.width, b.height, b.confidence
            );
            if let Some(landmarks) = &b.landmarks {
                let points: Vec<String> = landmarks
                    .iter()
                    .map(|(x, y)| format!("({x:.0}, {y:.0})"))
                    .collect();
                println!("    landmarks: {}", points.join(" "));
            }
        }
    }

    if let Some(out) = annotate_out {
        let annotations: Vec<Annotation> = faces
            .iter()
            .map(|f| Annotation {
                bbox: f.bbox.clone(),
                label: format!("{:.2}", f.bbox.confidence),
            })
            .collect();
        let font = annotate::load_label_font(None);
        let mut canvas = image;
        annotate::draw_annotations(&mut canvas, &annotations, font.as_ref());
        canvas
            .save(out)
            .with_context(|| format!("failed to write {}", out.display()))?;
        println!("annotated image written to {}", out.display());
    }

    Ok(())
}

fn face_json(face: &Face) -> serde_json::Value {
    serde_json::json!({
        "x": face.bbox.x,
        "y": face.bbox.y,
        "width": face.bbox.width,
        "height": face.bbox.height,
        "confidence": face.bbox.confidence,
        "landmarks": face.bbox.landmarks,
        "embedding_dims": face.embedding.values.len(),
    })
}

fn cmd_compare(a: &Path, b: &Path, threshold: f32, model_dir: &Path) -> Result<()> {
    let mut analyzer = open_analyzer(model_dir)?;
    let face_a = best_face(&mut analyzer, a)?;
    let face_b = best_face(&mut analyzer, b)?;

    let similarity = face_a.embedding.similarity(&face_b.embedding);
    let distance = face_a.embedding.euclidean_distance(&face_b.embedding);

    println!("cosine similarity:  {similarity:.4}");
    println!("euclidean distance: {distance:.4}");
    // Same strict-greater rule the daemon applies.
    if similarity > threshold {
        println!("verdict: match (threshold {threshold})");
    } else {
        println!("verdict: no match (threshold {threshold})");
    }

    Ok(())
}

/// Analyze an image and return its highest-confidence face.
fn best_face(analyzer: &mut FaceAnalyzer, path: &Path) -> Result<Face> {
    let image = load_rgb(path)?;
    analyzer
        .analyze(&image)?
        .into_iter()
        .next()
        .with_context(|| format!("no face detected in {}", path.display()))
}

fn cmd_models(model_dir: &Path) -> Result<()> {
    println!("model directory: {}", model_dir.display());
    let mut missing = false;
    for (role, file) in [
        ("detector (scrfd)", mien_core::SCRFD_MODEL_FILE),
        ("recognizer (arcface)", mien_core::ARCFACE_MODEL_FILE),
    ] {
        let path = model_dir.join(file);
        if path.exists() {
            println!("  {role}: {} [ok]", path.display());
        } else {
            println!("  {role}: {} [missing]", path.display());
            missing = true;
        }
    }
    if missing {
        anyhow::bail!("one or more model files are missing; fetch the insightface buffalo_l bundle");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_model_dir_defaults_to_the_shared_location() {
        let cli = Cli::try_parse_from(["mien", "models"]).expect("parse");
        match cli.command {
            Commands::Models { model_dir } => {
                assert_eq!(model_dir, mien_core::default_model_dir());
            }
            _ => panic!("expected models command"),
        }
    }

    #[test]
    fn test_detect_flags_parse() {
        let cli = Cli::try_parse_from([
            "mien",
            "detect",
            "photo.jpg",
            "--json",
            "--model-dir",
            "/opt/models",
        ])
        .expect("parse");
        match cli.command {
            Commands::Detect {
                image,
                json,
                model_dir,
                ..
            } => {
                assert_eq!(image, PathBuf::from("photo.jpg"));
                assert!(json);
                assert_eq!(model_dir, PathBuf::from("/opt/models"));
            }
            _ => panic!("expected detect command"),
        }
    }
}

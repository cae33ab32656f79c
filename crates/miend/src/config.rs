use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Cosine similarity a match must strictly exceed.
    pub similarity_threshold: f32,
    /// Upper bound on a request body (the uploaded photo).
    pub max_upload_bytes: usize,
    /// Optional TTF override for on-image name labels.
    pub label_font: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `MIEN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("MIEN_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| mien_core::default_model_dir());

        Self {
            bind_addr: std::env::var("MIEN_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            model_dir,
            similarity_threshold: env_f32("MIEN_SIMILARITY_THRESHOLD", 0.40),
            max_upload_bytes: env_usize("MIEN_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            label_font: std::env::var("MIEN_LABEL_FONT").ok().map(PathBuf::from),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_dir
            .join(mien_core::SCRFD_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir
            .join(mien_core::ARCFACE_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

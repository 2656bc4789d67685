use std::path::PathBuf;

/// Default request body cap.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind the HTTP server to (default: 0.0.0.0).
    pub host: String,
    /// Listening port (default: 3030).
    pub port: u16,
    /// CORS origins; `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Third-party movie database key. Carried for downstream recommendation, not used by the handler.
    pub tmdb_api_key: Option<String>,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// SCRFD model file name inside `model_dir`.
    pub detector_model: String,
    /// FER+ model file name inside `model_dir`.
    pub classifier_model: String,
    /// Largest accepted request body in bytes (default: 16 MiB).
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from the process environment with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let model_dir = lookup("MOODLENS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(moodlens_core::default_model_dir);

        Self {
            host: lookup("MOODLENS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(lookup("PORT"), 3030),
            allowed_origins: parse_origins(lookup("ALLOWED_ORIGINS").as_deref()),
            tmdb_api_key: lookup("TMDB_API_KEY").filter(|k| !k.trim().is_empty()),
            model_dir,
            detector_model: lookup("MOODLENS_DETECTOR_MODEL")
                .unwrap_or_else(|| moodlens_core::DEFAULT_DETECTOR_MODEL.to_string()),
            classifier_model: lookup("MOODLENS_CLASSIFIER_MODEL")
                .unwrap_or_else(|| moodlens_core::DEFAULT_CLASSIFIER_MODEL.to_string()),
            max_body_bytes: parse_or(lookup("MOODLENS_MAX_BODY_BYTES"), DEFAULT_MAX_BODY_BYTES),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join(&self.detector_model)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the FER+ classification model.
    pub fn classifier_model_path(&self) -> String {
        self.model_dir
            .join(&self.classifier_model)
            .to_string_lossy()
            .into_owned()
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Comma-separated origin list; empty or missing means any origin.
fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let origins: Vec<String> = raw
        .unwrap_or("*")
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::model::{ModelName, YoloParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    fn parse(raw: Option<String>) -> Self {
        match raw.unwrap_or_default().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub addr: String,
    pub annotated_dir: PathBuf,
    pub models_dir: PathBuf,
    pub default_model: ModelName,
    pub font_path: Option<PathBuf>,
    pub yolo: YoloParams,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = YoloParams::default();
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let default_model = string("DETECT_DEFAULT_MODEL", "yolov8n");
        let default_model = ModelName::parse(&default_model)
            .map_err(|e| anyhow!("DETECT_DEFAULT_MODEL: {e}"))?;

        Ok(Self {
            environment: Environment::parse(lookup("ENVIRONMENT")),
            addr: string("DETECT_ADDR", "0.0.0.0:8000"),
            annotated_dir: string("DETECT_ANNOTATED_DIR", "annotated").into(),
            models_dir: string("DETECT_MODELS_DIR", "models").into(),
            default_model,
            font_path: lookup("DETECT_FONT_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            yolo: YoloParams {
                input_size: parsed(&lookup, "DETECT_INPUT_SIZE", defaults.input_size)?,
                conf_threshold: parsed(&lookup, "DETECT_CONF_THRESHOLD", defaults.conf_threshold)?,
                iou_threshold: parsed(&lookup, "DETECT_IOU_THRESHOLD", defaults.iou_threshold)?,
                max_detections: parsed(&lookup, "DETECT_MAX_DETECTIONS", defaults.max_detections)?,
            },
            max_upload_bytes: parsed(&lookup, "DETECT_MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("{key}={raw:?} no es válido")),
        None => Ok(default),
    }
}

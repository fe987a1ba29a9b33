use serde::Serialize;

use crate::domain::{
    detection::{AnnotatedResult, DetectionResult},
    model::ModelName,
};

#[derive(Debug, Clone, Serialize)]
pub struct DetectResponse {
    pub results: Vec<DetectionResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedResponse {
    pub results: Vec<AnnotatedResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchModelResponse {
    pub message: String,
}

impl From<ModelName> for SwitchModelResponse {
    fn from(name: ModelName) -> Self {
        Self { message: format!("Model switched to {name}") }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub current: ModelName,
    pub available: Vec<ModelName>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

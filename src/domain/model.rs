use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{DomainError, DomainResult};

/// Entrada de la tabla de registro: nombre lógico y fichero de pesos asociado.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    pub name: &'static str,
    pub weights: &'static str,
}

/// Variantes soportadas. Añadir un modelo es añadir una fila aquí.
pub const SUPPORTED_MODELS: &[ModelSpec] = &[
    ModelSpec { name: "yolov8n", weights: "yolov8n.onnx" },
    ModelSpec { name: "yolov8s", weights: "yolov8s.onnx" },
];

/// Nombre de modelo validado contra `SUPPORTED_MODELS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelName(&'static ModelSpec);

impl ModelName {
    pub fn parse(name: &str) -> DomainResult<Self> {
        SUPPORTED_MODELS
            .iter()
            .find(|spec| spec.name == name)
            .map(ModelName)
            .ok_or_else(|| DomainError::UnsupportedModel(name.to_string()))
    }

    pub fn all() -> impl Iterator<Item = ModelName> {
        SUPPORTED_MODELS.iter().map(ModelName)
    }

    pub fn as_str(&self) -> &'static str {
        self.0.name
    }

    pub fn weights_file(&self) -> &'static str {
        self.0.weights
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name)
    }
}

impl Serialize for ModelName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub conf_threshold: f32,    // 0..1
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,  // e.g. 300
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

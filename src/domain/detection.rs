use serde::{Deserialize, Serialize};

/// Objeto detectado: etiqueta, confianza en [0,1] y caja `[x1, y1, x2, y2]` en píxeles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: [i32; 4],
}

impl Detection {
    /// Normaliza la caja (x1<=x2, y1<=y2) y acota la confianza a [0,1].
    pub fn new(label: impl Into<String>, confidence: f32, bbox: [i32; 4]) -> Self {
        let [ax, ay, bx, by] = bbox;
        Self {
            label: label.into(),
            confidence: if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) },
            bbox: [ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub filename: String,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedResult {
    pub filename: String,
    pub detections: Vec<Detection>,
    pub download_url: String,
}

/// Fichero recibido en una petición multipart, aún sin validar.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

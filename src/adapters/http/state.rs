use std::sync::Arc;
use crate::application::services::DetectionService;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Detección, anotación, descargas y cambio de modelo.
    pub detection: Arc<DetectionService>,
}

use async_trait::async_trait;
use image::RgbImage;
use std::sync::Arc;

use crate::domain::{detection::Detection, errors::DomainResult, model::ModelName};

/// Modelo ya cargado. `infer` es bloqueante y se invoca desde el pool de `spawn_blocking`.
pub trait DetectorPort: Send + Sync {
    fn infer(&self, image: &RgbImage) -> DomainResult<Vec<Detection>>;
}

#[async_trait]
pub trait ModelProviderPort: Send + Sync {
    async fn load(&self, name: ModelName) -> DomainResult<Arc<dyn DetectorPort>>;
}

pub trait AnnotatorPort: Send + Sync {
    fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> DomainResult<RgbImage>;
}

#[async_trait]
pub trait ArtifactStorePort: Send + Sync {
    async fn save(&self, name: &str, bytes: Vec<u8>) -> DomainResult<()>;
    async fn read(&self, name: &str) -> DomainResult<Vec<u8>>;
}

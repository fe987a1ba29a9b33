use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::adapters::onnx::yolo_engine::OnnxYoloEngine;
use crate::application::ports::{DetectorPort, ModelProviderPort};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ModelName, YoloParams};

/// Resuelve cada `ModelName` a `<models_dir>/<pesos>.onnx` y guarda los motores ya
/// cargados, de modo que volver a un modelo anterior no relee el fichero.
pub struct OnnxModelCatalog {
    models_dir: PathBuf,
    params: YoloParams,
    loaded: Mutex<HashMap<ModelName, Arc<OnnxYoloEngine>>>,
}

impl OnnxModelCatalog {
    pub fn new(models_dir: impl Into<PathBuf>, params: YoloParams) -> Self {
        Self { models_dir: models_dir.into(), params, loaded: Mutex::new(HashMap::new()) }
    }

    pub fn weights_path(&self, name: ModelName) -> PathBuf {
        self.models_dir.join(name.weights_file())
    }

    fn cached(&self, name: ModelName) -> Option<Arc<OnnxYoloEngine>> {
        self.loaded.lock().ok()?.get(&name).cloned()
    }
}

#[async_trait]
impl ModelProviderPort for OnnxModelCatalog {
    async fn load(&self, name: ModelName) -> DomainResult<Arc<dyn DetectorPort>> {
        if let Some(engine) = self.cached(name) {
            return Ok(engine);
        }

        let path = self.weights_path(name);
        if !path.exists() {
            return Err(DomainError::ModelLoad {
                name: name.to_string(),
                reason: format!("model file not found: {}", path.display()),
            });
        }

        info!(model = %name, path = %path.display(), "Cargando modelo ONNX");
        let params = self.params.clone();
        let engine = tokio::task::spawn_blocking(move || OnnxYoloEngine::load(&path, params))
            .await
            .map_err(|e| e.to_string())
            .and_then(|res| res.map_err(|e| e.to_string()))
            .map_err(|reason| DomainError::ModelLoad { name: name.to_string(), reason })?;

        let engine = Arc::new(engine);
        if let Ok(mut loaded) = self.loaded.lock() {
            loaded.insert(name, engine.clone());
        }
        Ok(engine)
    }
}

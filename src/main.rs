use std::sync::Arc;

use yolo_detect_api::{
    adapters::{
        http::{router, state::HttpState},
        imaging::annotator::ImageAnnotator,
        onnx::model_catalog::OnnxModelCatalog,
        storage::fs_store::FsArtifactStore,
    },
    application::services::DetectionService,
    config::AppConfig,
    logging::setup_logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuración y logs
    let config = AppConfig::from_env()?;
    setup_logging(config.environment);
    tracing::info!(config = ?config, environment = config.environment.as_str(), "🔧 Configuración cargada");

    // 2. Adaptadores de infraestructura
    let catalog = Arc::new(OnnxModelCatalog::new(&config.models_dir, config.yolo.clone()));
    let store = Arc::new(FsArtifactStore::open(&config.annotated_dir)?);
    let annotator = Arc::new(match &config.font_path {
        Some(path) => ImageAnnotator::with_font_file(path)?,
        None => ImageAnnotator::default(),
    });
    tracing::info!("📂 Imágenes anotadas en {}", store.root().display());

    // 3. Caso de uso: carga el modelo por defecto antes de aceptar peticiones
    let detection = Arc::new(
        DetectionService::start(catalog, annotator, store, config.default_model).await?,
    );

    // 4. Router y servidor
    let app = router(HttpState { detection }, config.max_upload_bytes);

    tracing::info!("🚀 Servidor de detección iniciado en http://{}", config.addr);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

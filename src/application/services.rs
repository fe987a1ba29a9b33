use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    application::{
        model_slot::{ActiveModel, ModelSlot},
        ports::{AnnotatorPort, ArtifactStorePort, ModelProviderPort},
    },
    domain::{
        detection::{AnnotatedResult, DetectionResult, ImageUpload},
        errors::{DomainError, DomainResult},
        model::ModelName,
    },
};

pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Prefijo de las referencias de descarga devueltas al cliente.
pub const DOWNLOAD_PREFIX: &str = "/download/";

/// Caso de uso principal: validar subidas, inferir con el modelo actual y,
/// opcionalmente, anotar y persistir el resultado.
pub struct DetectionService {
    provider: Arc<dyn ModelProviderPort>,
    annotator: Arc<dyn AnnotatorPort>,
    store: Arc<dyn ArtifactStorePort>,
    current: ModelSlot,
}

impl DetectionService {
    /// Carga el modelo inicial y construye el servicio.
    pub async fn start(
        provider: Arc<dyn ModelProviderPort>,
        annotator: Arc<dyn AnnotatorPort>,
        store: Arc<dyn ArtifactStorePort>,
        initial: ModelName,
    ) -> DomainResult<Self> {
        let detector = provider.load(initial).await?;
        info!(model = %initial, "Modelo inicial cargado");

        Ok(Self {
            provider,
            annotator,
            store,
            current: ModelSlot::new(ActiveModel { name: initial, detector }),
        })
    }

    pub async fn detect(&self, uploads: Vec<ImageUpload>) -> DomainResult<Vec<DetectionResult>> {
        validate_batch(&uploads)?;
        let model = self.current.get();

        let mut results = Vec::with_capacity(uploads.len());
        for ImageUpload { filename, bytes, .. } in uploads {
            let model = model.clone();
            let detections = run_blocking(move || {
                let image = decode_rgb(&bytes)?;
                model.detector.infer(&image)
            })
            .await?;

            debug!(%filename, count = detections.len(), "Imagen procesada");
            results.push(DetectionResult { filename, detections });
        }
        Ok(results)
    }

    pub async fn detect_and_annotate(
        &self,
        uploads: Vec<ImageUpload>,
    ) -> DomainResult<Vec<AnnotatedResult>> {
        validate_batch(&uploads)?;
        let model = self.current.get();

        // Nada se guarda hasta que todo el lote se ha anotado.
        let mut annotated = Vec::with_capacity(uploads.len());
        for ImageUpload { filename, bytes, .. } in uploads {
            let model = model.clone();
            let annotator = self.annotator.clone();
            let (detections, png) = run_blocking(move || {
                let image = decode_rgb(&bytes)?;
                let detections = model.detector.infer(&image)?;
                let annotated = annotator.annotate(&image, &detections)?;
                Ok((detections, encode_png(&annotated)?))
            })
            .await?;
            annotated.push((filename, detections, png));
        }

        let mut results = Vec::with_capacity(annotated.len());
        for (filename, detections, png) in annotated {
            let stored = stored_filename(&filename);
            self.store.save(&stored, png).await?;
            info!(%filename, %stored, count = detections.len(), "Imagen anotada guardada");

            results.push(AnnotatedResult {
                filename,
                detections,
                download_url: format!("{DOWNLOAD_PREFIX}{stored}"),
            });
        }
        Ok(results)
    }

    /// Carga `name` y, solo si la carga termina bien, lo publica como modelo actual.
    pub async fn switch_model(&self, name: &str) -> DomainResult<ModelName> {
        let name = ModelName::parse(name)?;
        let detector = self.provider.load(name).await?;
        self.current.set(ActiveModel { name, detector });
        info!(model = %name, "Modelo cambiado");
        Ok(name)
    }

    pub async fn download(&self, filename: &str) -> DomainResult<Vec<u8>> {
        self.store.read(filename).await
    }

    pub fn current_model(&self) -> ModelName {
        self.current.get().name
    }

    pub fn available_models(&self) -> Vec<ModelName> {
        ModelName::all().collect()
    }
}

fn validate_batch(uploads: &[ImageUpload]) -> DomainResult<()> {
    if uploads.is_empty() {
        return Err(DomainError::InvalidInput("no se recibió ningún fichero".into()));
    }
    for upload in uploads {
        let essence = media_type_essence(&upload.content_type);
        if !ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
            return Err(DomainError::UnsupportedMediaType(upload.content_type.clone()));
        }
    }
    Ok(())
}

/// `image/PNG; foo=bar` -> `image/png`
fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn decode_rgb(bytes: &[u8]) -> DomainResult<RgbImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| DomainError::Decode(e.to_string()))
}

fn encode_png(image: &RgbImage) -> DomainResult<Vec<u8>> {
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| DomainError::Annotation(e.to_string()))?;
    Ok(png.into_inner())
}

/// `{uuid}_{nombre original saneado}.png`
fn stored_filename(original: &str) -> String {
    format!("{}_{}.png", Uuid::new_v4().simple(), sanitize_filename(original))
}

fn sanitize_filename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' };
        // el almacén no acepta `..` dentro de un nombre
        if c == '.' && cleaned.ends_with('.') {
            continue;
        }
        cleaned.push(c);
    }
    if cleaned.trim_matches('.').is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

async fn run_blocking<T, F>(job: F) -> DomainResult<T>
where
    F: FnOnce() -> DomainResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| DomainError::Inference(format!("tarea bloqueante abortada: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::DetectorPort;
    use crate::domain::detection::Detection;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Devuelve una detección cuya etiqueta es el nombre del modelo.
    struct NamedDetector {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl DetectorPort for NamedDetector {
        fn infer(&self, image: &RgbImage) -> DomainResult<Vec<Detection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (w, h) = image.dimensions();
            Ok(vec![Detection::new(self.name, 0.9, [0, 0, w as i32 / 2, h as i32 / 2])])
        }
    }

    #[derive(Default)]
    struct StubProvider {
        calls: Arc<AtomicUsize>,
        broken: Option<&'static str>,
    }

    #[async_trait]
    impl ModelProviderPort for StubProvider {
        async fn load(&self, name: ModelName) -> DomainResult<Arc<dyn DetectorPort>> {
            if self.broken == Some(name.as_str()) {
                return Err(DomainError::ModelLoad {
                    name: name.to_string(),
                    reason: "weights missing".into(),
                });
            }
            Ok(Arc::new(NamedDetector { name: name.as_str(), calls: self.calls.clone() }))
        }
    }

    struct CopyAnnotator;

    impl AnnotatorPort for CopyAnnotator {
        fn annotate(&self, image: &RgbImage, _detections: &[Detection]) -> DomainResult<RgbImage> {
            Ok(image.clone())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl ArtifactStorePort for MemoryStore {
        async fn save(&self, name: &str, bytes: Vec<u8>) -> DomainResult<()> {
            self.files.lock().unwrap().insert(name.to_string(), bytes);
            Ok(())
        }

        async fn read(&self, name: &str) -> DomainResult<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| DomainError::NotFound(name.to_string()))
        }
    }

    async fn service_with(provider: StubProvider) -> DetectionService {
        DetectionService::start(
            Arc::new(provider),
            Arc::new(CopyAnnotator),
            Arc::new(MemoryStore::default()),
            ModelName::parse("yolov8n").unwrap(),
        )
        .await
        .unwrap()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        encode_png(&RgbImage::new(width, height)).unwrap()
    }

    fn upload(filename: &str, content_type: &str, bytes: Vec<u8>) -> ImageUpload {
        ImageUpload { filename: filename.into(), content_type: content_type.into(), bytes }
    }

    #[tokio::test]
    async fn detect_keeps_upload_order() {
        let svc = service_with(StubProvider::default()).await;
        let results = svc
            .detect(vec![
                upload("a.png", "image/png", png(10, 10)),
                upload("b.png", "image/png", png(20, 40)),
            ])
            .await
            .unwrap();

        let names: Vec<_> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, ["a.png", "b.png"]);
        assert_eq!(results[1].detections[0].bbox, [0, 0, 10, 20]);
    }

    #[tokio::test]
    async fn detect_rejects_text_plain_without_inferring() {
        let provider = StubProvider::default();
        let calls = provider.calls.clone();
        let svc = service_with(provider).await;

        let err = svc
            .detect(vec![upload("notes.txt", "text/plain", b"hello".to_vec())])
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::UnsupportedMediaType(ref ct) if ct == "text/plain"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn content_type_parameters_and_case_are_ignored() {
        let svc = service_with(StubProvider::default()).await;
        let results = svc
            .detect(vec![upload("a.png", "Image/PNG; charset=binary", png(4, 4))])
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn batch_aborts_on_first_decode_failure() {
        let svc = service_with(StubProvider::default()).await;
        let err = svc
            .detect(vec![
                upload("1.png", "image/png", png(8, 8)),
                upload("2.png", "image/png", b"not a png".to_vec()),
                upload("3.png", "image/png", png(8, 8)),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_batch_is_invalid_input() {
        let svc = service_with(StubProvider::default()).await;
        assert!(matches!(svc.detect(vec![]).await, Err(DomainError::InvalidInput(_))));
        assert!(matches!(svc.detect_and_annotate(vec![]).await, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn switch_model_is_used_by_later_detections() {
        let svc = service_with(StubProvider::default()).await;
        for name in ["yolov8s", "yolov8n"] {
            svc.switch_model(name).await.unwrap();
            assert_eq!(svc.current_model().as_str(), name);
            let results = svc.detect(vec![upload("x.png", "image/png", png(4, 4))]).await.unwrap();
            assert_eq!(results[0].detections[0].label, name);
        }
    }

    #[tokio::test]
    async fn failed_switch_keeps_current_model() {
        let svc = service_with(StubProvider { broken: Some("yolov8s"), ..Default::default() }).await;

        assert!(matches!(
            svc.switch_model("yolov9").await,
            Err(DomainError::UnsupportedModel(_))
        ));
        assert!(matches!(svc.switch_model("yolov8s").await, Err(DomainError::ModelLoad { .. })));
        assert_eq!(svc.current_model().as_str(), "yolov8n");
    }

    #[tokio::test]
    async fn annotated_uploads_get_distinct_downloads() {
        let svc = service_with(StubProvider::default()).await;
        let first = svc
            .detect_and_annotate(vec![upload("test.png", "image/png", png(30, 20))])
            .await
            .unwrap();
        let second = svc
            .detect_and_annotate(vec![upload("test.png", "image/png", png(30, 20))])
            .await
            .unwrap();

        let a = &first[0].download_url;
        let b = &second[0].download_url;
        assert_ne!(a, b);
        assert!(a.starts_with(DOWNLOAD_PREFIX) && a.ends_with("_test.png.png"));

        for url in [a, b] {
            let bytes = svc.download(url.trim_start_matches(DOWNLOAD_PREFIX)).await.unwrap();
            let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
            assert_eq!((img.width(), img.height()), (30, 20));
        }
    }

    #[tokio::test]
    async fn failed_annotated_batch_stores_nothing() {
        let store = Arc::new(MemoryStore::default());
        let svc = DetectionService::start(
            Arc::new(StubProvider::default()),
            Arc::new(CopyAnnotator),
            store.clone(),
            ModelName::parse("yolov8n").unwrap(),
        )
        .await
        .unwrap();

        let err = svc
            .detect_and_annotate(vec![
                upload("1.png", "image/png", png(8, 8)),
                upload("2.png", "image/png", b"not a png".to_vec()),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Decode(_)));
        assert!(store.files.lock().unwrap().is_empty());
    }

    #[test]
    fn sanitize_keeps_only_the_final_component() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\dog.jpg"), "dog.jpg");
        assert_eq!(sanitize_filename("my cat.png"), "my_cat.png");
        assert_eq!(sanitize_filename(".."), "image");
        assert_eq!(sanitize_filename("photo..png"), "photo.png");
        assert_eq!(sanitize_filename("a...b....png"), "a.b.png");
        assert_eq!(sanitize_filename("..png"), ".png");
        assert_eq!(sanitize_filename(""), "image");
    }

    #[test]
    fn stored_names_are_unique_per_call() {
        let a = stored_filename("test.png");
        let b = stored_filename("test.png");
        assert_ne!(a, b);
        assert!(a.ends_with("_test.png.png"));
        assert_eq!(a.split('_').next().unwrap().len(), 32);
    }
}

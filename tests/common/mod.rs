#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use yolo_detect_api::{
    adapters::{
        http::{router, state::HttpState},
        imaging::annotator::ImageAnnotator,
        storage::fs_store::FsArtifactStore,
    },
    application::{
        ports::{DetectorPort, ModelProviderPort},
        services::DetectionService,
    },
    domain::{detection::Detection, errors::DomainResult, model::ModelName},
};

pub const BOUNDARY: &str = "detect-test-boundary";

/// Cada modelo devuelve un conjunto de detecciones distinguible.
pub struct StubDetector(ModelName);

impl DetectorPort for StubDetector {
    fn infer(&self, _image: &RgbImage) -> DomainResult<Vec<Detection>> {
        Ok(match self.0.as_str() {
            "yolov8n" => vec![Detection::new("box", 0.9, [10, 10, 50, 50])],
            other => vec![Detection::new(other, 0.5, [0, 0, 5, 5])],
        })
    }
}

pub struct StubProvider;

#[async_trait]
impl ModelProviderPort for StubProvider {
    async fn load(&self, name: ModelName) -> DomainResult<Arc<dyn DetectorPort>> {
        Ok(Arc::new(StubDetector(name)))
    }
}

pub async fn app(annotated_dir: &Path) -> Router {
    let store = Arc::new(FsArtifactStore::open(annotated_dir).unwrap());
    let detection = DetectionService::start(
        Arc::new(StubProvider),
        Arc::new(ImageAnnotator::default()),
        store,
        ModelName::parse("yolov8n").unwrap(),
    )
    .await
    .unwrap();
    router(HttpState { detection: Arc::new(detection) }, 10 * 1024 * 1024)
}

pub fn black_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height).write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn black_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height).write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

/// (nombre de fichero, content-type, bytes)
pub fn multipart_request(uri: &str, files: &[(&str, &str, Vec<u8>)]) -> Request<Body> {
    let mut body = Vec::new();
    for (filename, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

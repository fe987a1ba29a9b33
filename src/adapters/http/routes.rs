use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{AnnotatedResponse, DetectResponse, ModelsResponse, SwitchModelResponse};
use crate::domain::{
    detection::ImageUpload,
    errors::{DomainError, DomainResult},
};

/// Cada parte con nombre de fichero cuenta como imagen; el resto se ignora.
async fn read_uploads(mut multipart: Multipart) -> DomainResult<Vec<ImageUpload>> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::InvalidInput(e.body_text()))?
    {
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DomainError::InvalidInput(e.body_text()))?;

        uploads.push(ImageUpload { filename, content_type, bytes: bytes.to_vec() });
    }
    Ok(uploads)
}

pub async fn detect(
    State(st): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let uploads = read_uploads(multipart).await?;
    info!(files = uploads.len(), "POST /detect");

    let results = st.detection.detect(uploads).await?;
    Ok(Json(DetectResponse { results }))
}

pub async fn detect_annotated(
    State(st): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<AnnotatedResponse>, ApiError> {
    let uploads = read_uploads(multipart).await?;
    info!(files = uploads.len(), "POST /detect/annotated");

    let results = st.detection.detect_and_annotate(uploads).await?;
    Ok(Json(AnnotatedResponse { results }))
}

pub async fn download(
    State(st): State<HttpState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = st.detection.download(&filename).await?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|_| DomainError::NotFound(filename.clone()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn switch_model(
    State(st): State<HttpState>,
    Path(model_name): Path<String>,
) -> Result<Json<SwitchModelResponse>, ApiError> {
    let name = st.detection.switch_model(&model_name).await?;
    Ok(Json(name.into()))
}

pub async fn list_models(State(st): State<HttpState>) -> impl IntoResponse {
    Json(ModelsResponse {
        current: st.detection.current_model(),
        available: st.detection.available_models(),
    })
}

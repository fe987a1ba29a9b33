use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::{error, warn};

use crate::application::dto::ErrorResponse;
use crate::domain::errors::DomainError;

/// Traduce errores de dominio a respuestas `{"detail": ...}` con su código HTTP.
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::ModelLoad { .. } | DomainError::Storage(_) | DomainError::Annotation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DomainError::UnsupportedMediaType(_)
            | DomainError::Decode(_)
            | DomainError::Inference(_)
            | DomainError::UnsupportedModel(_)
            | DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_client_error() {
            warn!(%status, error = ?self.0, "Petición rechazada");
        } else {
            error!(%status, error = ?self.0, "Fallo interno");
        }
        (status, Json(ErrorResponse { detail: self.0.to_string() })).into_response()
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid image format. Use JPEG/PNG.")]
    UnsupportedMediaType(String),
    #[error("Imagen corrupta o ilegible: {0}")]
    Decode(String),
    #[error("Fallo de inferencia: {0}")]
    Inference(String),
    #[error("Unsupported model. Use {}.", supported_list())]
    UnsupportedModel(String),
    #[error("File not found")]
    NotFound(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("No se pudo cargar el modelo {name}: {reason}")]
    ModelLoad { name: String, reason: String },
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    #[error("Error de anotación: {0}")]
    Annotation(String),
}

impl DomainError {
    /// `true` cuando el fallo lo provoca la petición del cliente y no el servidor.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            DomainError::ModelLoad { .. } | DomainError::Storage(_) | DomainError::Annotation(_)
        )
    }
}

fn supported_list() -> String {
    super::model::SUPPORTED_MODELS
        .iter()
        .map(|m| format!("'{}'", m.name))
        .collect::<Vec<_>>()
        .join(" or ")
}

pub type DomainResult<T> = Result<T, DomainError>;

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::application::ports::ArtifactStorePort;
use crate::domain::errors::{DomainError, DomainResult};

/// Directorio plano de imágenes anotadas. Los nombres son la única forma de
/// direccionarlas; nada se borra automáticamente.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Crea el directorio si no existe.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Solo nombres de un único componente; cualquier otra cosa no puede existir aquí.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0'])
            && !name.contains("..");
        plain.then(|| self.root.join(name))
    }
}

#[async_trait]
impl ArtifactStorePort for FsArtifactStore {
    async fn save(&self, name: &str, bytes: Vec<u8>) -> DomainResult<()> {
        let path = self
            .resolve(name)
            .ok_or_else(|| DomainError::Storage(format!("nombre de fichero no válido: {name}")))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::Storage(format!("{}: {e}", path.display())))
    }

    async fn read(&self, name: &str) -> DomainResult<Vec<u8>> {
        let path = self.resolve(name).ok_or_else(|| DomainError::NotFound(name.to_string()))?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(DomainError::NotFound(name.to_string()))
            }
            Err(e) => Err(DomainError::Storage(format!("{}: {e}", path.display()))),
        }
    }
}

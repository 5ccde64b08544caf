//! The persisted "default catalog" selection.
use crate::error::DownloaderError;
use crate::fsutil::write_atomic;
use crate::identity::{CatalogIdentity, Language, Topic};
use log::{info, warn};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

pub struct DefaultCatalogSelector {
    path: PathBuf,
}

impl DefaultCatalogSelector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The persisted default, or [`CatalogIdentity::FALLBACK`] when none has
    /// been set or the stored value cannot be read.
    pub async fn get(&self) -> Result<CatalogIdentity, DownloaderError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CatalogIdentity::FALLBACK),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<CatalogIdentity>(&raw) {
            Ok(identity) => Ok(identity),
            Err(e) => {
                warn!(
                    "Ignoring unreadable default catalog in {}: {}",
                    self.path.display(),
                    e
                );
                Ok(CatalogIdentity::FALLBACK)
            }
        }
    }

    pub async fn set(&self, identity: CatalogIdentity) -> Result<(), DownloaderError> {
        let json = serde_json::to_vec_pretty(&identity)?;
        write_atomic(&self.path, &json).await?;
        info!("Default catalog set to {}", identity);
        Ok(())
    }

    /// Validates the pair before persisting it.
    pub async fn set_pair(
        &self,
        language: Language,
        topic: Topic,
    ) -> Result<CatalogIdentity, DownloaderError> {
        let identity = CatalogIdentity::new(language, topic)?;
        self.set(identity).await?;
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_without_file_returns_fallback() {
        let dir = TempDir::new().unwrap();
        let selector = DefaultCatalogSelector::new(dir.path().join("default-catalog.json"));
        assert_eq!(selector.get().await.unwrap(), CatalogIdentity::FALLBACK);
    }

    #[tokio::test]
    async fn test_set_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("default-catalog.json");
        let identity = CatalogIdentity::new(Language::German, Topic::EmergencyNursing).unwrap();

        DefaultCatalogSelector::new(&path).set(identity).await.unwrap();

        assert_eq!(DefaultCatalogSelector::new(&path).get().await.unwrap(), identity);
    }

    #[tokio::test]
    async fn test_set_pair_rejects_english_nursing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("default-catalog.json");
        let selector = DefaultCatalogSelector::new(&path);

        let err = selector
            .set_pair(Language::English, Topic::EmergencyNursing)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloaderError::InvalidIdentity { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("default-catalog.json");
        std::fs::write(&path, r#"{"language":"en","topic":"med"}"#).unwrap();
        let selector = DefaultCatalogSelector::new(&path);
        assert_eq!(selector.get().await.unwrap(), CatalogIdentity::FALLBACK);
    }
}

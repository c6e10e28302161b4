use crate::config::{StoreBackend, StoreConfig};
use crate::error::{AppError, Result};
use crate::store::{InMemoryModelStore, InMemoryPredictionLog, ModelStore, PredictionLog, SledStore};
use std::sync::Arc;

/// Create the model store and prediction log based on configuration.
///
/// The sled backend serves both capabilities from one database; the memory
/// backend uses independent stores.
pub fn create_stores(
    config: &StoreConfig,
) -> Result<(Arc<dyn ModelStore>, Arc<dyn PredictionLog>)> {
    match config.backend {
        StoreBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration(
                    "Sled backend requires 'path' configuration".to_string(),
                )
            })?;

            tracing::info!(path = ?path, "Initializing Sled storage backend");

            let store = Arc::new(SledStore::new(path)?);
            let models: Arc<dyn ModelStore> = store.clone();
            let history: Arc<dyn PredictionLog> = store;
            Ok((models, history))
        }

        StoreBackend::Memory => Ok(create_in_memory_stores()),
    }
}

/// Create in-memory stores (for testing and development).
pub fn create_in_memory_stores() -> (Arc<dyn ModelStore>, Arc<dyn PredictionLog>) {
    tracing::info!("Initializing in-memory storage backend");
    let models: Arc<dyn ModelStore> = Arc::new(InMemoryModelStore::new());
    let history: Arc<dyn PredictionLog> = Arc::new(InMemoryPredictionLog::new());
    (models, history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_config(backend: StoreBackend, path: Option<std::path::PathBuf>) -> StoreConfig {
        StoreConfig {
            backend,
            path,
            fetch_timeout_secs: 5,
            max_retries: 3,
            retry_backoff_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_create_sled_stores() {
        let temp_dir = TempDir::new().unwrap();
        let config = store_config(StoreBackend::Sled, Some(temp_dir.path().to_path_buf()));

        let (models, history) = create_stores(&config).unwrap();
        assert!(models.load_pipeline().await.unwrap().is_none());
        assert!(history.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sled_requires_path() {
        let config = store_config(StoreBackend::Sled, None);
        assert!(create_stores(&config).is_err());
    }

    #[tokio::test]
    async fn test_create_memory_stores() {
        let config = store_config(StoreBackend::Memory, None);
        let (models, history) = create_stores(&config).unwrap();

        assert!(models.load_metrics().await.unwrap().is_none());
        assert!(history.recent(10).await.unwrap().is_empty());
    }
}

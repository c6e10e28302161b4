use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::ml::pipeline::FittedPipeline;
use crate::models::{PredictionResult, StudentRecord};
use crate::store::ModelStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Inference service over the persisted fitted pipeline.
///
/// The pipeline is fetched lazily on the first prediction and then shared
/// read-only by all concurrent callers as a process-wide immutable handle.
/// Loading is guarded by a load-once mutex, so concurrent first callers
/// trigger a single store fetch; `invalidate` clears the handle (after a
/// retraining run) and the next prediction reloads.
pub struct PredictionService {
    store: Arc<dyn ModelStore>,
    cached: RwLock<Option<Arc<FittedPipeline>>>,
    load_lock: Mutex<()>,
    fetch_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl PredictionService {
    pub fn new(store: Arc<dyn ModelStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
            load_lock: Mutex::new(()),
            fetch_timeout: config.fetch_timeout(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        }
    }

    /// Make a career success prediction for one student.
    ///
    /// Domain validation runs first; an invalid field surfaces before any
    /// store access or inference is attempted.
    pub async fn predict(&self, record: &StudentRecord) -> Result<PredictionResult> {
        record.validate()?;

        let pipeline = self.load_pipeline().await?;
        let probability = pipeline.predict_proba(record);
        let result = PredictionResult::from_probability(probability);

        debug!(
            predicted_label = result.predicted_label,
            probability = result.probability,
            confidence = result.confidence,
            "Prediction served"
        );

        Ok(result)
    }

    /// Fetch the pipeline, caching it for the life of the process.
    ///
    /// Idempotent and safe under concurrent invocation: the fast path is a
    /// shared read of the cached handle, the slow path re-checks under the
    /// load mutex before fetching.
    pub async fn load_pipeline(&self) -> Result<Arc<FittedPipeline>> {
        if let Some(pipeline) = self.cached.read().await.as_ref() {
            return Ok(pipeline.clone());
        }

        let _guard = self.load_lock.lock().await;
        if let Some(pipeline) = self.cached.read().await.as_ref() {
            return Ok(pipeline.clone());
        }

        let pipeline = Arc::new(self.fetch_with_retry().await?);
        *self.cached.write().await = Some(pipeline.clone());

        info!(
            pipeline_id = %pipeline.id,
            trained_at = %pipeline.trained_at,
            "Fitted pipeline loaded and cached"
        );

        Ok(pipeline)
    }

    /// Drop the cached handle so the next prediction reloads from the store.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
        info!("Cached pipeline invalidated");
    }

    /// Whether a pipeline is currently cached.
    pub async fn is_loaded(&self) -> bool {
        self.cached.read().await.is_some()
    }

    async fn fetch_with_retry(&self) -> Result<FittedPipeline> {
        let mut attempt: u32 = 0;
        loop {
            let outcome =
                tokio::time::timeout(self.fetch_timeout, self.store.load_pipeline()).await;

            let err = match outcome {
                Ok(Ok(Some(pipeline))) => return Ok(pipeline),
                Ok(Ok(None)) => return Err(AppError::ModelNotTrained),
                Ok(Err(e)) if e.is_retryable() => e,
                Ok(Err(e)) => return Err(e),
                Err(_) => AppError::StoreUnavailable(format!(
                    "model store fetch timed out after {:?}",
                    self.fetch_timeout
                )),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            attempt += 1;

            warn!(attempt, error = %err, "Model store fetch failed, retrying");
            tokio::time::sleep(self.retry_backoff * attempt).await;
        }
    }
}

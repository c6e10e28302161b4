use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::models::EvaluationMetrics;
use crate::store::ModelStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Read-only access to the metrics of the last completed training run.
///
/// Pure retrieval: metrics are computed once per training run and stored
/// alongside the pipeline; nothing is recomputed at request time.
pub struct MetricsReporter {
    store: Arc<dyn ModelStore>,
    fetch_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl MetricsReporter {
    pub fn new(store: Arc<dyn ModelStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            fetch_timeout: config.fetch_timeout(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        }
    }

    /// Stored evaluation metrics, verbatim.
    pub async fn metrics(&self) -> Result<EvaluationMetrics> {
        let mut attempt: u32 = 0;
        loop {
            let outcome =
                tokio::time::timeout(self.fetch_timeout, self.store.load_metrics()).await;

            let err = match outcome {
                Ok(Ok(Some(metrics))) => return Ok(metrics),
                Ok(Ok(None)) => return Err(AppError::MetricsUnavailable),
                Ok(Err(e)) if e.is_retryable() => e,
                Ok(Err(e)) => return Err(e),
                Err(_) => AppError::StoreUnavailable(format!(
                    "metrics fetch timed out after {:?}",
                    self.fetch_timeout
                )),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            attempt += 1;

            warn!(attempt, error = %err, "Metrics fetch failed, retrying");
            tokio::time::sleep(self.retry_backoff * attempt).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;
    use crate::ml::encoder::{FeatureEncoder, FeatureRow};
    use crate::ml::forest::{Forest, ForestParams};
    use crate::ml::pipeline::FittedPipeline;
    use crate::models::FeatureImportance;
    use crate::store::InMemoryModelStore;

    fn test_store_config() -> StoreConfig {
        StoreConfig {
            backend: StoreBackend::Memory,
            path: None,
            fetch_timeout_secs: 2,
            max_retries: 1,
            retry_backoff_ms: 5,
        }
    }

    fn sample_metrics() -> EvaluationMetrics {
        EvaluationMetrics {
            accuracy: 0.85,
            precision: 0.8,
            recall: 0.9,
            f1_score: 0.847,
            roc_auc: Some(0.91),
            feature_importances: vec![FeatureImportance {
                feature: "University_GPA".to_string(),
                importance: 1.0,
            }],
            roc_curve: None,
        }
    }

    fn sample_pipeline() -> FittedPipeline {
        let rows: Vec<FeatureRow> = (0..10)
            .map(|i| FeatureRow {
                numeric: [Some(i as f64), Some(5.0), Some(5.0), Some(1.0)],
                categorical: [Some("Arts".to_string()), Some("Male".to_string())],
            })
            .collect();
        let labels: Vec<u8> = (0..10).map(|i| (i >= 5) as u8).collect();

        let encoder = FeatureEncoder::fit(&rows).unwrap();
        let matrix = encoder.transform_matrix(&rows);
        let forest = Forest::fit(
            matrix.view(),
            &labels,
            ForestParams {
                n_trees: 5,
                max_depth: 3,
                min_samples_split: 2,
                seed: 1,
            },
        )
        .unwrap();

        FittedPipeline::new(encoder, forest)
    }

    #[tokio::test]
    async fn test_metrics_unavailable_before_training() {
        let store = Arc::new(InMemoryModelStore::new());
        let reporter = MetricsReporter::new(store, &test_store_config());

        let err = reporter.metrics().await.unwrap_err();
        assert!(matches!(err, AppError::MetricsUnavailable));
    }

    #[tokio::test]
    async fn test_metrics_returned_verbatim() {
        let store = Arc::new(InMemoryModelStore::new());
        let saved = sample_metrics();
        store.save(&sample_pipeline(), &saved).await.unwrap();

        let reporter = MetricsReporter::new(store, &test_store_config());
        let loaded = reporter.metrics().await.unwrap();

        assert_eq!(loaded, saved);
    }
}

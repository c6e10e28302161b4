use crate::error::Result;
use crate::ml::FittedPipeline;
use crate::models::{EvaluationMetrics, PredictionRecord};
use crate::store::{ModelStore, PredictionLog};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory model store (for tests and development).
///
/// Keeps the serialized blobs rather than the structs so the save/load
/// round-trip exercises the same contract as durable backends.
#[derive(Clone, Default)]
pub struct InMemoryModelStore {
    pipeline: Arc<RwLock<Option<Vec<u8>>>>,
    metrics: Arc<RwLock<Option<Vec<u8>>>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn save(&self, pipeline: &FittedPipeline, metrics: &EvaluationMetrics) -> Result<()> {
        let pipeline_blob = bincode::serialize(pipeline)?;
        let metrics_blob = bincode::serialize(metrics)?;

        *self.pipeline.write().await = Some(pipeline_blob);
        *self.metrics.write().await = Some(metrics_blob);

        tracing::debug!(pipeline_id = %pipeline.id, "Pipeline saved to in-memory store");
        Ok(())
    }

    async fn load_pipeline(&self) -> Result<Option<FittedPipeline>> {
        match self.pipeline.read().await.as_deref() {
            Some(blob) => Ok(Some(bincode::deserialize(blob)?)),
            None => Ok(None),
        }
    }

    async fn load_metrics(&self) -> Result<Option<EvaluationMetrics>> {
        match self.metrics.read().await.as_deref() {
            Some(blob) => Ok(Some(bincode::deserialize(blob)?)),
            None => Ok(None),
        }
    }
}

/// In-memory prediction log (for tests and development).
#[derive(Clone, Default)]
pub struct InMemoryPredictionLog {
    records: Arc<DashMap<Uuid, PredictionRecord>>,
}

impl InMemoryPredictionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PredictionLog for InMemoryPredictionLog {
    async fn append(&self, record: &PredictionRecord) -> Result<()> {
        self.records.insert(record.id, record.clone());
        tracing::debug!(record_id = %record.id, "Prediction appended to history");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        let mut records: Vec<PredictionRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first; break timestamp ties by id for a stable order
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        records.truncate(limit);

        Ok(records)
    }
}

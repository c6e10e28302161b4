use crate::error::{AppError, Result};
use crate::ml::FittedPipeline;
use crate::models::{EvaluationMetrics, PredictionRecord};
use crate::store::{ModelStore, PredictionLog};
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Key for the persisted pipeline blob inside the model tree
const PIPELINE_KEY: &[u8] = b"pipeline";

/// Key for the persisted metrics blob inside the model tree
const METRICS_KEY: &[u8] = b"metrics";

/// Persistent model store and prediction log using the Sled embedded
/// database.
///
/// The pipeline and metrics live as bincode blobs under fixed keys; history
/// records are keyed by big-endian timestamp so a reverse scan yields them
/// newest first.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    model_tree: sled::Tree,
    history_tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) a Sled store at the specified path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(&path)?;
        let model_tree = db.open_tree("model")?;
        let history_tree = db.open_tree("history")?;

        tracing::info!(path = ?path.as_ref(), "Initialized Sled store");

        Ok(Self {
            db: Arc::new(db),
            model_tree,
            history_tree,
        })
    }

    /// History key: millisecond timestamp (big-endian) + record id.
    ///
    /// The id suffix keeps keys unique when two predictions land on the
    /// same millisecond.
    fn history_key(record: &PredictionRecord) -> Vec<u8> {
        let mut key = Vec::with_capacity(24);
        key.extend_from_slice(&record.timestamp.timestamp_millis().to_be_bytes());
        key.extend_from_slice(record.id.as_bytes());
        key
    }
}

#[async_trait]
impl ModelStore for SledStore {
    async fn save(&self, pipeline: &FittedPipeline, metrics: &EvaluationMetrics) -> Result<()> {
        let pipeline_blob = bincode::serialize(pipeline)?;
        let metrics_blob = bincode::serialize(metrics)?;

        self.model_tree.insert(PIPELINE_KEY, pipeline_blob)?;
        self.model_tree.insert(METRICS_KEY, metrics_blob)?;

        // The model artifact must survive a crash right after training
        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        tracing::info!(pipeline_id = %pipeline.id, "Pipeline and metrics persisted");
        Ok(())
    }

    async fn load_pipeline(&self) -> Result<Option<FittedPipeline>> {
        match self.model_tree.get(PIPELINE_KEY)? {
            Some(blob) => Ok(Some(bincode::deserialize(&blob)?)),
            None => Ok(None),
        }
    }

    async fn load_metrics(&self) -> Result<Option<EvaluationMetrics>> {
        match self.model_tree.get(METRICS_KEY)? {
            Some(blob) => Ok(Some(bincode::deserialize(&blob)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PredictionLog for SledStore {
    async fn append(&self, record: &PredictionRecord) -> Result<()> {
        let blob = bincode::serialize(record)?;
        self.history_tree.insert(Self::history_key(record), blob)?;

        tracing::debug!(record_id = %record.id, "Prediction appended to history");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        let mut records = Vec::with_capacity(limit.min(64));

        for entry in self.history_tree.iter().rev().take(limit) {
            let (_, blob) = entry?;
            records.push(bincode::deserialize(&blob)?);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredictionResult, StudentRecord};
    use tempfile::TempDir;

    fn sample_record() -> PredictionRecord {
        let input = StudentRecord {
            university_gpa: 7.2,
            field_of_study: "Business".to_string(),
            gender: "Male".to_string(),
            internships_completed: 2,
            soft_skills_score: 6.5,
            networking_score: 7.0,
        };
        PredictionRecord::new(input, &PredictionResult::from_probability(0.64))
    }

    #[tokio::test]
    async fn test_empty_store_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = SledStore::new(dir.path()).unwrap();

        assert!(store.load_pipeline().await.unwrap().is_none());
        assert!(store.load_metrics().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_round_trip_and_order() {
        let dir = TempDir::new().unwrap();
        let store = SledStore::new(dir.path()).unwrap();

        for i in 0..4 {
            let mut record = sample_record();
            record.timestamp = chrono::Utc::now() + chrono::Duration::seconds(i);
            record.input.internships_completed = i as u32;
            store.append(&record).await.unwrap();
        }

        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input.internships_completed, 3);
        assert_eq!(recent[1].input.internships_completed, 2);
    }

    #[tokio::test]
    async fn test_reopen_preserves_history() {
        let dir = TempDir::new().unwrap();

        {
            let store = SledStore::new(dir.path()).unwrap();
            store.append(&sample_record()).await.unwrap();
            store.db.flush().unwrap();
        }

        let reopened = SledStore::new(dir.path()).unwrap();
        assert_eq!(reopened.recent(10).await.unwrap().len(), 1);
    }
}

pub mod factory;
pub mod memory;
pub mod sled_store;

pub use factory::{create_in_memory_stores, create_stores};
pub use memory::{InMemoryModelStore, InMemoryPredictionLog};
pub use sled_store::SledStore;

use crate::error::Result;
use crate::ml::FittedPipeline;
use crate::models::{EvaluationMetrics, PredictionRecord};
use async_trait::async_trait;

/// Persistence capability for the fitted pipeline and its metrics.
///
/// The stored artifact is an opaque serialized blob to callers; backends
/// must round-trip it byte-identically, so a reloaded pipeline predicts
/// exactly like the one that was saved.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Persist a fitted pipeline together with its evaluation metrics
    async fn save(&self, pipeline: &FittedPipeline, metrics: &EvaluationMetrics) -> Result<()>;

    /// Load the persisted pipeline; `None` if no training run has completed
    async fn load_pipeline(&self) -> Result<Option<FittedPipeline>>;

    /// Load the persisted evaluation metrics
    async fn load_metrics(&self) -> Result<Option<EvaluationMetrics>>;
}

/// Append-only log of served predictions.
#[async_trait]
pub trait PredictionLog: Send + Sync {
    /// Append one prediction record
    async fn append(&self, record: &PredictionRecord) -> Result<()>;

    /// Most recent records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>>;
}

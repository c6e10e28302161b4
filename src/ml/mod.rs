/// Machine learning module for career success prediction
///
/// This module provides the inference and model-lifecycle subsystem:
/// - Deterministic feature encoding (imputation, one-hot, scaling)
/// - Offline training of a bagged decision-tree ensemble
/// - Held-out evaluation metrics (accuracy, precision, recall, F1, ROC)
/// - Lazy, shared-read pipeline caching for concurrent inference
/// - Stored-metrics reporting

pub mod encoder;
pub mod forest;
pub mod metrics;
pub mod pipeline;
pub mod reporter;
pub mod service;
pub mod training;

pub use encoder::{FeatureEncoder, FeatureRow, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
pub use forest::{Forest, ForestParams};
pub use pipeline::FittedPipeline;
pub use reporter::MetricsReporter;
pub use service::PredictionService;
pub use training::{train, TrainingParams, MIN_TRAINING_RECORDS};

use crate::error::{AppError, Result};
use crate::ml::encoder::{FeatureEncoder, FeatureRow};
use crate::ml::forest::{Forest, ForestParams};
use crate::ml::metrics::{roc_auc, roc_curve, threshold_metrics};
use crate::ml::pipeline::FittedPipeline;
use crate::models::{EvaluationMetrics, FeatureImportance, LabeledRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Minimum number of labeled records required for a training run.
pub const MIN_TRAINING_RECORDS: usize = 10;

/// Parameters of one training run.
///
/// The run seed drives both the train/test partition and the per-tree seeds
/// of the ensemble, so the same dataset and seed reproduce the same
/// pipeline and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Fraction of records assigned to the train partition
    pub split_ratio: f64,

    /// Run seed
    pub seed: u64,

    /// Ensemble hyperparameters
    pub forest: ForestParams,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            split_ratio: 0.8,
            seed: 42,
            forest: ForestParams::default(),
        }
    }
}

impl TrainingParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Fit the full pipeline on labeled records and evaluate it on a held-out
/// partition.
///
/// Labels are derived by the fixed success thresholds, the partition is a
/// seeded stratified split, and encoder statistics come from the train
/// partition only. Metrics that need both classes in the test partition are
/// reported as `None` when only one is present.
pub fn train(
    records: &[LabeledRecord],
    params: &TrainingParams,
) -> Result<(FittedPipeline, EvaluationMetrics)> {
    if records.len() < MIN_TRAINING_RECORDS {
        return Err(AppError::InsufficientData {
            needed: MIN_TRAINING_RECORDS,
            got: records.len(),
        });
    }
    if !(params.split_ratio > 0.0 && params.split_ratio < 1.0) {
        return Err(AppError::Validation(format!(
            "split_ratio must be strictly between 0 and 1, got {}",
            params.split_ratio
        )));
    }

    let labels: Vec<u8> = records.iter().map(LabeledRecord::career_success).collect();
    let (train_idx, test_idx) = stratified_split(&labels, params.split_ratio, params.seed);

    if train_idx.is_empty() || test_idx.is_empty() {
        return Err(AppError::InsufficientData {
            needed: MIN_TRAINING_RECORDS,
            got: records.len(),
        });
    }

    info!(
        n_records = records.len(),
        n_train = train_idx.len(),
        n_test = test_idx.len(),
        seed = params.seed,
        "Starting training run"
    );

    let train_rows: Vec<FeatureRow> = train_idx.iter().map(|&i| (&records[i]).into()).collect();
    let test_rows: Vec<FeatureRow> = test_idx.iter().map(|&i| (&records[i]).into()).collect();
    let y_train: Vec<u8> = train_idx.iter().map(|&i| labels[i]).collect();
    let y_test: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();

    // Encoder statistics come from the train partition only; the test
    // partition must not leak into imputation, scaling, or vocabulary.
    let encoder = FeatureEncoder::fit(&train_rows)?;

    let x_train = encoder.transform_matrix(&train_rows);
    let forest_params = params.forest.with_seed(params.seed);
    let forest = Forest::fit(x_train.view(), &y_train, forest_params)?;

    let x_test = encoder.transform_matrix(&test_rows);
    let probabilities = forest.predict_proba_matrix(x_test.view());
    let y_pred: Vec<u8> = probabilities.iter().map(|&p| (p >= 0.5) as u8).collect();

    let threshold = threshold_metrics(&y_test, &y_pred);
    let curve = roc_curve(&y_test, &probabilities);
    let auc = curve.as_ref().map(roc_auc);
    if auc.is_none() {
        info!("Test partition contains a single class; ROC metrics are undefined");
    }

    let mut feature_importances: Vec<FeatureImportance> = encoder
        .feature_names()
        .iter()
        .zip(forest.feature_importances())
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    feature_importances.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.feature.cmp(&b.feature))
    });

    let metrics = EvaluationMetrics {
        accuracy: threshold.accuracy,
        precision: threshold.precision,
        recall: threshold.recall,
        f1_score: threshold.f1,
        roc_auc: auc,
        feature_importances,
        roc_curve: curve,
    };

    let pipeline = FittedPipeline::new(encoder, forest);

    info!(
        pipeline_id = %pipeline.id,
        accuracy = metrics.accuracy,
        roc_auc = ?metrics.roc_auc,
        "Training run completed"
    );

    Ok((pipeline, metrics))
}

/// Seeded stratified partition of record indices.
///
/// Each class is shuffled and split independently, so the class balance of
/// the test partition mirrors the dataset. The same seed always yields the
/// same partition.
fn stratified_split(labels: &[u8], split_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == class)
            .map(|(i, _)| i)
            .collect();

        indices.shuffle(&mut rng);

        let n_test = (indices.len() as f64 * (1.0 - split_ratio)).round() as usize;
        test.extend(indices.drain(..n_test));
        train.extend(indices);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

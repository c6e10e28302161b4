use crate::ml::encoder::{FeatureEncoder, FeatureRow};
use crate::ml::forest::Forest;
use crate::models::StudentRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fitted preprocessing + classification pipeline.
///
/// Immutable once trained: the training run owns it until it is handed to
/// the model store, after which it is shared read-only by all inference
/// callers. Serializes to a self-contained blob that round-trips through
/// bincode byte-identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    /// Artifact version identifier
    pub id: Uuid,

    /// When the training run finished fitting
    pub trained_at: DateTime<Utc>,

    encoder: FeatureEncoder,
    forest: Forest,
}

impl FittedPipeline {
    pub fn new(encoder: FeatureEncoder, forest: Forest) -> Self {
        Self {
            id: Uuid::new_v4(),
            trained_at: Utc::now(),
            encoder,
            forest,
        }
    }

    /// Positive-class probability for one validated record.
    pub fn predict_proba(&self, record: &StudentRecord) -> f64 {
        let row = FeatureRow::from(record);
        self.forest.predict_proba(&self.encoder.transform(&row))
    }

    /// Encoded column names in pipeline order.
    pub fn feature_names(&self) -> &[String] {
        self.encoder.feature_names()
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::ForestParams;

    fn tiny_pipeline() -> FittedPipeline {
        let rows: Vec<FeatureRow> = (0..12)
            .map(|i| {
                let positive = i % 2 == 0;
                FeatureRow {
                    numeric: [
                        Some(if positive { 9.0 } else { 3.0 }),
                        Some(5.0 + (i % 3) as f64),
                        Some(4.0),
                        Some((i % 4) as f64),
                    ],
                    categorical: [
                        Some("Computer Science".to_string()),
                        Some(if i % 3 == 0 { "Female" } else { "Male" }.to_string()),
                    ],
                }
            })
            .collect();
        let labels: Vec<u8> = (0..12).map(|i| (i % 2 == 0) as u8).collect();

        let encoder = FeatureEncoder::fit(&rows).unwrap();
        let matrix = encoder.transform_matrix(&rows);
        let forest = Forest::fit(
            matrix.view(),
            &labels,
            ForestParams {
                n_trees: 20,
                max_depth: 4,
                min_samples_split: 2,
                seed: 3,
            },
        )
        .unwrap();

        FittedPipeline::new(encoder, forest)
    }

    fn probe() -> StudentRecord {
        StudentRecord {
            university_gpa: 8.8,
            field_of_study: "Computer Science".to_string(),
            gender: "Male".to_string(),
            internships_completed: 2,
            soft_skills_score: 6.0,
            networking_score: 4.0,
        }
    }

    #[test]
    fn test_predict_proba_in_bounds() {
        let pipeline = tiny_pipeline();
        let p = pipeline.predict_proba(&probe());
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_bincode_round_trip_preserves_predictions() {
        let pipeline = tiny_pipeline();

        let blob = bincode::serialize(&pipeline).unwrap();
        let restored: FittedPipeline = bincode::deserialize(&blob).unwrap();

        assert_eq!(restored, pipeline);
        assert_eq!(restored.predict_proba(&probe()), pipeline.predict_proba(&probe()));

        // Byte-identical on re-serialization
        assert_eq!(bincode::serialize(&restored).unwrap(), blob);
    }

    #[test]
    fn test_feature_names_expose_encoder_order(){
        let pipeline = tiny_pipeline();
        assert_eq!(pipeline.feature_names()[0], "University_GPA");
        assert_eq!(
            pipeline.feature_names().len(),
            pipeline.encoder().n_features()
        );
    }
}

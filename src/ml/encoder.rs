use crate::error::{AppError, Result};
use crate::models::{LabeledRecord, StudentRecord};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Numeric dataset columns, in encoding order.
pub const NUMERIC_COLUMNS: [&str; 4] = [
    "University_GPA",
    "Soft_Skills_Score",
    "Networking_Score",
    "Internships_Completed",
];

/// Categorical dataset columns, encoded after the numeric block.
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["Field_of_Study", "Gender"];

/// One raw observation as seen by the encoder.
///
/// Inference inputs are always complete (validation runs first); training
/// rows may carry missing values, which the fitted statistics impute.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub numeric: [Option<f64>; 4],
    pub categorical: [Option<String>; 2],
}

impl From<&StudentRecord> for FeatureRow {
    fn from(record: &StudentRecord) -> Self {
        Self {
            numeric: [
                Some(record.university_gpa),
                Some(record.soft_skills_score),
                Some(record.networking_score),
                Some(f64::from(record.internships_completed)),
            ],
            categorical: [
                Some(record.field_of_study.clone()),
                Some(record.gender.clone()),
            ],
        }
    }
}

impl From<&LabeledRecord> for FeatureRow {
    fn from(row: &LabeledRecord) -> Self {
        Self {
            numeric: [
                row.university_gpa,
                row.soft_skills_score,
                row.networking_score,
                row.internships_completed.map(f64::from),
            ],
            categorical: [row.field_of_study.clone(), row.gender.clone()],
        }
    }
}

/// Frozen imputation + scaling statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    /// Training-set mean; also the imputation value
    pub mean: f64,

    /// Training-set population standard deviation
    pub std: f64,
}

impl NumericStats {
    /// Standardize one value, imputing the training mean when missing.
    ///
    /// A zero-variance column maps every value to 0.
    fn encode(&self, value: Option<f64>) -> f64 {
        let x = value.unwrap_or(self.mean);
        if self.std > 0.0 {
            (x - self.mean) / self.std
        } else {
            0.0
        }
    }
}

/// Frozen vocabulary for one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    /// Training-set mode; also the imputation value
    pub mode: String,

    /// Categories observed at training time, sorted
    pub categories: Vec<String>,
}

impl CategoryVocabulary {
    /// Index of a category within the one-hot block.
    ///
    /// Unknown categories return `None` and encode to an all-zero block.
    fn position(&self, value: &str) -> Option<usize> {
        self.categories.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }
}

/// Deterministic transform from raw student attributes to a fixed-order
/// numeric feature vector: mean imputation + standardization for numeric
/// columns, mode imputation + one-hot encoding for categorical columns.
///
/// All statistics are computed once at fit time and frozen; the same input
/// and the same fitted parameters always produce bit-identical output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    numeric: Vec<NumericStats>,
    categorical: Vec<CategoryVocabulary>,
    feature_names: Vec<String>,
}

impl FeatureEncoder {
    /// Fit imputation, scaling, and vocabulary statistics on training rows.
    pub fn fit(rows: &[FeatureRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(AppError::Internal(
                "cannot fit feature encoder on an empty partition".to_string(),
            ));
        }

        let mut numeric = Vec::with_capacity(NUMERIC_COLUMNS.len());
        for idx in 0..NUMERIC_COLUMNS.len() {
            let values: Vec<f64> = rows.iter().filter_map(|r| r.numeric[idx]).collect();
            numeric.push(Self::fit_numeric(&values));
        }

        let mut categorical = Vec::with_capacity(CATEGORICAL_COLUMNS.len());
        for idx in 0..CATEGORICAL_COLUMNS.len() {
            let values: Vec<&str> = rows
                .iter()
                .filter_map(|r| r.categorical[idx].as_deref())
                .collect();
            categorical.push(Self::fit_categorical(&values));
        }

        let mut feature_names: Vec<String> =
            NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        for (column, vocab) in CATEGORICAL_COLUMNS.iter().zip(&categorical) {
            for category in &vocab.categories {
                feature_names.push(format!("{column}_{category}"));
            }
        }

        Ok(Self {
            numeric,
            categorical,
            feature_names,
        })
    }

    fn fit_numeric(values: &[f64]) -> NumericStats {
        if values.is_empty() {
            // Column entirely missing: impute 0, zero variance
            return NumericStats { mean: 0.0, std: 0.0 };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        NumericStats {
            mean,
            std: variance.sqrt(),
        }
    }

    fn fit_categorical(values: &[&str]) -> CategoryVocabulary {
        // BTreeMap keeps category order deterministic; on tied counts the
        // lexicographically smallest value wins the mode.
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values {
            *counts.entry(value).or_insert(0) += 1;
        }

        let mode = counts
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(value, _)| value.to_string())
            .unwrap_or_default();

        CategoryVocabulary {
            mode,
            categories: counts.keys().map(|v| v.to_string()).collect(),
        }
    }

    /// Encode one row into a fixed-order feature vector.
    pub fn transform(&self, row: &FeatureRow) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_features());

        for (stats, value) in self.numeric.iter().zip(row.numeric) {
            out.push(stats.encode(value));
        }

        for (vocab, value) in self.categorical.iter().zip(&row.categorical) {
            let category = value.as_deref().unwrap_or(vocab.mode.as_str());
            let hot = vocab.position(category);

            for idx in 0..vocab.categories.len() {
                out.push(if hot == Some(idx) { 1.0 } else { 0.0 });
            }
        }

        out
    }

    /// Encode a batch of rows into an `(n_rows, n_features)` matrix.
    pub fn transform_matrix(&self, rows: &[FeatureRow]) -> Array2<f64> {
        let mut matrix = Array2::zeros((rows.len(), self.n_features()));
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in self.transform(row).into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }
        matrix
    }

    /// Width of the encoded feature vector.
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Encoded column names: numeric columns, then `{column}_{category}`
    /// indicators in vocabulary order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        gpa: f64,
        soft: f64,
        networking: f64,
        internships: f64,
        field: &str,
        gender: &str,
    ) -> FeatureRow {
        FeatureRow {
            numeric: [Some(gpa), Some(soft), Some(networking), Some(internships)],
            categorical: [Some(field.to_string()), Some(gender.to_string())],
        }
    }

    fn fitted_encoder() -> FeatureEncoder {
        FeatureEncoder::fit(&[
            row(6.0, 5.0, 4.0, 1.0, "Arts", "Female"),
            row(8.0, 7.0, 6.0, 3.0, "Computer Science", "Male"),
            row(7.0, 6.0, 5.0, 2.0, "Computer Science", "Female"),
        ])
        .unwrap()
    }

    #[test]
    fn test_feature_names_order() {
        let encoder = fitted_encoder();
        assert_eq!(
            encoder.feature_names(),
            &[
                "University_GPA",
                "Soft_Skills_Score",
                "Networking_Score",
                "Internships_Completed",
                "Field_of_Study_Arts",
                "Field_of_Study_Computer Science",
                "Gender_Female",
                "Gender_Male",
            ]
        );
        assert_eq!(encoder.n_features(), 8);
    }

    #[test]
    fn test_standardization() {
        let encoder = fitted_encoder();
        let encoded = encoder.transform(&row(7.0, 6.0, 5.0, 2.0, "Arts", "Male"));

        // 7.0 is the GPA mean of the fit rows
        assert!(encoded[0].abs() < 1e-12);
        // One-hot: Arts set, Computer Science clear, Male set
        assert_eq!(&encoded[4..8], &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_determinism_bit_identical() {
        let encoder = fitted_encoder();
        let input = row(6.3, 5.1, 4.9, 2.0, "Computer Science", "Female");

        let first = encoder.transform(&input);
        let second = encoder.transform(&input);
        assert_eq!(first, second);

        // Refitting on the same data gives the same parameters
        let refit = fitted_encoder();
        assert_eq!(encoder, refit);
        assert_eq!(refit.transform(&input), first);
    }

    #[test]
    fn test_unknown_category_encodes_all_zero_block() {
        let encoder = fitted_encoder();
        let encoded = encoder.transform(&row(7.0, 6.0, 5.0, 2.0, "Quantum Basketry", "Male"));

        // Field_of_Study block is all zeros, Gender block still encodes
        assert_eq!(&encoded[4..6], &[0.0, 0.0]);
        assert_eq!(&encoded[6..8], &[0.0, 1.0]);
    }

    #[test]
    fn test_missing_numeric_imputes_mean() {
        let encoder = fitted_encoder();
        let mut input = row(0.0, 6.0, 5.0, 2.0, "Arts", "Female");
        input.numeric[0] = None;

        // Imputed to the mean, which standardizes to exactly 0
        let encoded = encoder.transform(&input);
        assert_eq!(encoded[0], 0.0);
    }

    #[test]
    fn test_missing_categorical_imputes_mode() {
        let encoder = fitted_encoder();
        let mut input = row(7.0, 6.0, 5.0, 2.0, "Arts", "Female");
        input.categorical[0] = None;

        // Mode of Field_of_Study is "Computer Science" (2 of 3 rows)
        let encoded = encoder.transform(&input);
        assert_eq!(&encoded[4..6], &[0.0, 1.0]);
    }

    #[test]
    fn test_zero_variance_column_encodes_zero() {
        let encoder = FeatureEncoder::fit(&[
            row(5.0, 5.0, 4.0, 1.0, "Arts", "Female"),
            row(5.0, 7.0, 6.0, 3.0, "Arts", "Male"),
        ])
        .unwrap();

        // GPA is constant across the fit rows
        let encoded = encoder.transform(&row(9.9, 6.0, 5.0, 2.0, "Arts", "Male"));
        assert_eq!(encoded[0], 0.0);
    }

    #[test]
    fn test_fit_rejects_empty_partition() {
        assert!(FeatureEncoder::fit(&[]).is_err());
    }

    #[test]
    fn test_transform_matrix_shape() {
        let encoder = fitted_encoder();
        let rows = vec![
            row(6.0, 5.0, 4.0, 1.0, "Arts", "Female"),
            row(8.0, 7.0, 6.0, 3.0, "Computer Science", "Male"),
        ];

        let matrix = encoder.transform_matrix(&rows);
        assert_eq!(matrix.dim(), (2, 8));
        assert_eq!(matrix.row(0).to_vec(), encoder.transform(&rows[0]));
    }
}

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum starting salary for a career to count as successful
pub const SUCCESS_SALARY_THRESHOLD: f64 = 50_000.0;

/// Minimum career satisfaction for a career to count as successful
pub const SUCCESS_SATISFACTION_THRESHOLD: f64 = 7.0;

/// Lower bound of the GPA / soft-skills / networking score domains
pub const SCORE_MIN: f64 = 0.0;

/// Upper bound of the GPA / soft-skills / networking score domains
pub const SCORE_MAX: f64 = 10.0;

/// A single student's attributes, submitted for one prediction.
///
/// Wire field names follow the dataset column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// University GPA, 0 to 10
    #[serde(rename = "University_GPA")]
    pub university_gpa: f64,

    /// Field of study (free-form category)
    #[serde(rename = "Field_of_Study")]
    pub field_of_study: String,

    /// Gender category
    #[serde(rename = "Gender")]
    pub gender: String,

    /// Number of internships completed
    #[serde(rename = "Internships_Completed")]
    pub internships_completed: u32,

    /// Soft skills score, 0 to 10
    #[serde(rename = "Soft_Skills_Score")]
    pub soft_skills_score: f64,

    /// Networking score, 0 to 10
    #[serde(rename = "Networking_Score")]
    pub networking_score: f64,
}

impl StudentRecord {
    /// Check every field against its documented domain.
    ///
    /// Runs before encoding; an out-of-domain field surfaces as
    /// [`AppError::InvalidInput`] naming the field and no inference is
    /// attempted.
    pub fn validate(&self) -> Result<()> {
        check_score("University_GPA", self.university_gpa)?;
        check_score("Soft_Skills_Score", self.soft_skills_score)?;
        check_score("Networking_Score", self.networking_score)?;

        if self.field_of_study.trim().is_empty() {
            return Err(AppError::invalid_input(
                "Field_of_Study",
                "must not be empty",
            ));
        }
        if self.gender.trim().is_empty() {
            return Err(AppError::invalid_input("Gender", "must not be empty"));
        }

        Ok(())
    }
}

fn check_score(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&value) {
        return Err(AppError::invalid_input(
            field,
            format!("must be between {SCORE_MIN} and {SCORE_MAX}, got {value}"),
        ));
    }
    Ok(())
}

/// A training row: student attributes plus the career outcome.
///
/// Feature fields may be missing in historical data; the encoder imputes
/// them from training-set statistics. The outcome fields are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    #[serde(rename = "University_GPA", default)]
    pub university_gpa: Option<f64>,

    #[serde(rename = "Field_of_Study", default)]
    pub field_of_study: Option<String>,

    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,

    #[serde(rename = "Internships_Completed", default)]
    pub internships_completed: Option<u32>,

    #[serde(rename = "Soft_Skills_Score", default)]
    pub soft_skills_score: Option<f64>,

    #[serde(rename = "Networking_Score", default)]
    pub networking_score: Option<f64>,

    /// Starting salary of the first job
    #[serde(rename = "Starting_Salary")]
    pub starting_salary: f64,

    /// Self-reported career satisfaction, 0 to 10
    #[serde(rename = "Career_Satisfaction")]
    pub career_satisfaction: f64,
}

impl LabeledRecord {
    /// Derive the binary training label.
    ///
    /// Success requires both a starting salary of at least
    /// [`SUCCESS_SALARY_THRESHOLD`] and a satisfaction of at least
    /// [`SUCCESS_SATISFACTION_THRESHOLD`].
    pub fn career_success(&self) -> u8 {
        let success = self.starting_salary >= SUCCESS_SALARY_THRESHOLD
            && self.career_satisfaction >= SUCCESS_SATISFACTION_THRESHOLD;
        success as u8
    }
}

impl From<&StudentRecord> for LabeledRecord {
    fn from(record: &StudentRecord) -> Self {
        Self {
            university_gpa: Some(record.university_gpa),
            field_of_study: Some(record.field_of_study.clone()),
            gender: Some(record.gender.clone()),
            internships_completed: Some(record.internships_completed),
            soft_skills_score: Some(record.soft_skills_score),
            networking_score: Some(record.networking_score),
            starting_salary: 0.0,
            career_satisfaction: 0.0,
        }
    }
}

/// Outcome of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted career success: 0 = not successful, 1 = successful
    pub predicted_label: u8,

    /// Probability of the successful outcome
    pub probability: f64,

    /// Derived certainty score: 0 at probability 0.5, 1 at the extremes
    pub confidence: f64,
}

impl PredictionResult {
    /// Build a result from the positive-class probability.
    ///
    /// The label uses the 0.5 decision threshold and the confidence is
    /// always recomputed from the probability, never stored independently.
    pub fn from_probability(probability: f64) -> Self {
        Self {
            predicted_label: (probability >= 0.5) as u8,
            probability,
            confidence: confidence_score(probability),
        }
    }
}

/// Confidence derived from a positive-class probability:
/// `|probability - 0.5| * 2`.
pub fn confidence_score(probability: f64) -> f64 {
    (probability - 0.5).abs() * 2.0
}

/// One row of the prediction history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Record ID
    pub id: Uuid,

    /// When the prediction was made
    pub timestamp: DateTime<Utc>,

    /// Input features used for the prediction
    pub input: StudentRecord,

    /// Predicted label (0 or 1)
    pub predicted_label: u8,

    /// Probability of the successful outcome
    pub probability: f64,
}

impl PredictionRecord {
    pub fn new(input: StudentRecord, result: &PredictionResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            input,
            predicted_label: result.predicted_label,
            probability: result.probability,
        }
    }
}

/// Importance attributed to one encoded feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// ROC curve as parallel false/true positive rate arrays.
///
/// Both arrays are the same length, non-decreasing, and span (0,0) to (1,1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
}

/// Held-out evaluation metrics of one training run.
///
/// `roc_auc` and `roc_curve` are `None` when the test partition contains a
/// single class and the sweep is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: Option<f64>,

    /// Per encoded column, sorted by importance descending; sums to 1
    pub feature_importances: Vec<FeatureImportance>,

    pub roc_curve: Option<RocCurve>,
}

use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::ml::{train, TrainingParams};
use crate::models::{
    EvaluationMetrics, LabeledRecord, PredictionRecord, PredictionResult, StudentRecord,
};
use crate::store::{ModelStore, PredictionLog};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Predict career success for one student
pub async fn predict_career_success(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictionResult>> {
    let record = request.into_record()?;
    let result = state.predictor.predict(&record).await?;

    // History persistence is best-effort: a log failure never fails the
    // prediction that was already served
    let history_record = PredictionRecord::new(record, &result);
    if let Err(e) = state.history.append(&history_record).await {
        tracing::warn!(error = %e, "Failed to append prediction to history");
    }

    Ok(Json(result))
}

/// Prediction request payload.
///
/// Fields are optional at the wire level so a missing field surfaces as an
/// invalid-input error naming the field, before the core ever runs.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "University_GPA")]
    pub university_gpa: Option<f64>,

    #[serde(rename = "Field_of_Study")]
    pub field_of_study: Option<String>,

    #[serde(rename = "Gender")]
    pub gender: Option<String>,

    #[serde(rename = "Internships_Completed")]
    pub internships_completed: Option<u32>,

    #[serde(rename = "Soft_Skills_Score")]
    pub soft_skills_score: Option<f64>,

    #[serde(rename = "Networking_Score")]
    pub networking_score: Option<f64>,
}

impl PredictRequest {
    fn into_record(self) -> Result<StudentRecord> {
        fn required<T>(value: Option<T>, field: &str) -> Result<T> {
            value.ok_or_else(|| AppError::invalid_input(field, "field is required"))
        }

        Ok(StudentRecord {
            university_gpa: required(self.university_gpa, "University_GPA")?,
            field_of_study: required(self.field_of_study, "Field_of_Study")?,
            gender: required(self.gender, "Gender")?,
            internships_completed: required(self.internships_completed, "Internships_Completed")?,
            soft_skills_score: required(self.soft_skills_score, "Soft_Skills_Score")?,
            networking_score: required(self.networking_score, "Networking_Score")?,
        })
    }
}

/// Get stored model evaluation metrics
pub async fn get_model_metrics(
    State(state): State<AppState>,
) -> Result<Json<EvaluationMetrics>> {
    let metrics = state.reporter.metrics().await?;
    Ok(Json(metrics))
}

/// Get recent prediction history
pub async fn get_prediction_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<PredictionRecord>>> {
    let limit = params
        .limit
        .unwrap_or(state.history_config.default_limit)
        .clamp(1, state.history_config.max_limit);

    let records = state.history.recent(limit).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Run a training job on a submitted dataset
pub async fn train_model(
    State(state): State<AppState>,
    Json(request): Json<TrainRequest>,
) -> Result<(StatusCode, Json<TrainResponse>)> {
    request.validate()?;

    let mut params = TrainingParams::default();
    if let Some(seed) = request.seed {
        params = params.with_seed(seed);
    }
    if let Some(split_ratio) = request.split_ratio {
        params.split_ratio = split_ratio;
    }

    let records = request.records;
    let n_records = records.len();

    // Ensemble fitting is CPU-bound; keep it off the async workers
    let (pipeline, metrics) = tokio::task::spawn_blocking(move || train(&records, &params))
        .await
        .map_err(|e| AppError::Internal(format!("training task failed: {e}")))??;

    state.model_store.save(&pipeline, &metrics).await?;

    // Future predictions must pick up the new artifact
    state.predictor.invalidate().await;

    tracing::info!(
        pipeline_id = %pipeline.id,
        n_records,
        accuracy = metrics.accuracy,
        "Training job completed and persisted"
    );

    Ok((
        StatusCode::CREATED,
        Json(TrainResponse {
            pipeline_id: pipeline.id,
            trained_at: pipeline.trained_at,
            n_records,
            metrics,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrainRequest {
    #[validate(length(min = 1))]
    pub records: Vec<LabeledRecord>,

    /// Run seed; defaults to the standard reproducible seed
    pub seed: Option<u64>,

    /// Train fraction override
    pub split_ratio: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub pipeline_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub n_records: usize,
    pub metrics: EvaluationMetrics,
}

#![allow(dead_code)]

use career_predictor::config::{Config, HistoryConfig, ObservabilityConfig, ServerConfig, StoreBackend, StoreConfig};
use career_predictor::ml::{ForestParams, TrainingParams};
use career_predictor::models::{LabeledRecord, StudentRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthetic labeled dataset with a learnable outcome.
///
/// Salary and satisfaction are clean functions of the features, so the
/// success concept is recoverable from modest sample sizes and predictions
/// on clearly positive or negative inputs are stable.
pub fn synthetic_dataset(n: usize, seed: u64) -> Vec<LabeledRecord> {
    let fields = ["Computer Science", "Engineering", "Business", "Arts"];
    let genders = ["Male", "Female"];
    let mut rng = StdRng::seed_from_u64(seed);

    (0..n)
        .map(|_| {
            let gpa: f64 = rng.gen_range(2.0..10.0);
            let internships: u32 = rng.gen_range(0..5);
            let soft: f64 = rng.gen_range(1.0..10.0);
            let networking: f64 = rng.gen_range(1.0..10.0);

            let salary =
                15_000.0 + 4_500.0 * gpa + 4_000.0 * f64::from(internships) + 500.0 * networking;
            let satisfaction = (1.5 + 0.55 * gpa + 0.35 * soft).min(10.0);

            LabeledRecord {
                university_gpa: Some(gpa),
                field_of_study: Some(fields[rng.gen_range(0..fields.len())].to_string()),
                gender: Some(genders[rng.gen_range(0..genders.len())].to_string()),
                internships_completed: Some(internships),
                soft_skills_score: Some(soft),
                networking_score: Some(networking),
                starting_salary: salary,
                career_satisfaction: satisfaction,
            }
        })
        .collect()
}

/// Dataset where every record derives the positive label.
pub fn all_successful_dataset(n: usize, seed: u64) -> Vec<LabeledRecord> {
    let mut records = synthetic_dataset(n, seed);
    for record in &mut records {
        record.starting_salary = 95_000.0;
        record.career_satisfaction = 9.5;
    }
    records
}

/// The canonical strong-candidate probe input.
pub fn scenario_record() -> StudentRecord {
    StudentRecord {
        university_gpa: 8.5,
        field_of_study: "Computer Science".to_string(),
        gender: "Male".to_string(),
        internships_completed: 3,
        soft_skills_score: 8.0,
        networking_score: 7.5,
    }
}

/// Reduced ensemble size keeps integration tests quick without changing
/// any contract under test.
pub fn fast_training_params(seed: u64) -> TrainingParams {
    TrainingParams {
        split_ratio: 0.8,
        seed,
        forest: ForestParams {
            n_trees: 40,
            max_depth: 8,
            min_samples_split: 5,
            seed,
        },
    }
}

/// Application config backed by in-memory stores.
pub fn memory_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            http_port: 0,
            request_timeout_secs: 5,
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            path: None,
            fetch_timeout_secs: 2,
            max_retries: 1,
            retry_backoff_ms: 5,
        },
        history: HistoryConfig::default(),
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "career-predictor-test".to_string(),
        },
    }
}

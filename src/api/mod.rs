pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::config::{Config, HistoryConfig};
use crate::ml::{MetricsReporter, PredictionService};
use crate::store::{ModelStore, PredictionLog};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<PredictionService>,
    pub reporter: Arc<MetricsReporter>,
    pub model_store: Arc<dyn ModelStore>,
    pub history: Arc<dyn PredictionLog>,
    pub history_config: HistoryConfig,
}

impl AppState {
    pub fn new(
        config: &Config,
        model_store: Arc<dyn ModelStore>,
        history: Arc<dyn PredictionLog>,
    ) -> Self {
        let predictor = Arc::new(PredictionService::new(model_store.clone(), &config.store));
        let reporter = Arc::new(MetricsReporter::new(model_store.clone(), &config.store));

        Self {
            predictor,
            reporter,
            model_store,
            history,
            history_config: config.history.clone(),
        }
    }
}

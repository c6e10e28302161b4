use career_predictor::{
    config::{Config, StoreBackend, StoreConfig},
    error::{AppError, Result},
    ml::{train, TrainingParams},
    models::LabeledRecord,
    store::{create_stores, ModelStore},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "career-predictor-cli")]
#[command(about = "Career Predictor offline tooling", long_about = None)]
struct Cli {
    /// Override the model store path
    #[arg(short, long, env = "CAREER__STORE__PATH")]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a pipeline on a JSON dataset and persist it to the model store
    Train {
        /// Path to a JSON array of labeled records
        #[arg(short, long)]
        dataset: PathBuf,

        /// Run seed (drives the train/test split and the ensemble)
        #[arg(short = 'S', long)]
        seed: Option<u64>,

        /// Train fraction, strictly between 0 and 1
        #[arg(short = 'r', long)]
        split_ratio: Option<f64>,
    },

    /// Print the stored metrics of the last training run
    Metrics,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "career_predictor=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let store_config = resolve_store_config(cli.store_path)?;

    match cli.command {
        Commands::Train {
            dataset,
            seed,
            split_ratio,
        } => {
            let records = load_dataset(&dataset)?;
            println!("Loaded {} labeled records from {:?}", records.len(), dataset);

            let mut params = TrainingParams::default();
            if let Some(seed) = seed {
                params = params.with_seed(seed);
            }
            if let Some(split_ratio) = split_ratio {
                params.split_ratio = split_ratio;
            }

            println!("Training ensemble (seed {})...", params.seed);
            let (pipeline, metrics) = train(&records, &params)?;

            let (model_store, _) = create_stores(&store_config)?;
            model_store.save(&pipeline, &metrics).await?;

            println!("✓ Pipeline {} persisted", pipeline.id);
            println!("\nModel performance:");
            println!("  accuracy:  {:.4}", metrics.accuracy);
            println!("  precision: {:.4}", metrics.precision);
            println!("  recall:    {:.4}", metrics.recall);
            println!("  f1_score:  {:.4}", metrics.f1_score);
            match metrics.roc_auc {
                Some(auc) => println!("  roc_auc:   {:.4}", auc),
                None => println!("  roc_auc:   undefined (single-class test partition)"),
            }

            println!("\nTop feature importances:");
            for fi in metrics.feature_importances.iter().take(10) {
                println!("  {:<40} {:.4}", fi.feature, fi.importance);
            }
        }

        Commands::Metrics => {
            let (model_store, _) = create_stores(&store_config)?;
            let metrics = model_store
                .load_metrics()
                .await?
                .ok_or(AppError::MetricsUnavailable)?;

            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
    }

    Ok(())
}

/// Store settings from the layered config, with the CLI path override.
fn resolve_store_config(store_path: Option<PathBuf>) -> Result<StoreConfig> {
    let mut store_config = Config::load().map(|c| c.store).unwrap_or_else(|_| StoreConfig {
        backend: StoreBackend::Sled,
        path: Some("./data/store".into()),
        fetch_timeout_secs: 5,
        max_retries: 3,
        retry_backoff_ms: 200,
    });

    if let Some(path) = store_path {
        store_config.backend = StoreBackend::Sled;
        store_config.path = Some(path);
    }

    Ok(store_config)
}

fn load_dataset(path: &PathBuf) -> Result<Vec<LabeledRecord>> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<LabeledRecord> = serde_json::from_str(&raw)?;
    Ok(records)
}

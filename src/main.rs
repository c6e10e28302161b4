use career_predictor::{
    api::{build_router, AppState},
    config::Config,
    store::create_stores,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "career_predictor=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        default_config()
    });

    tracing::info!("Starting Career Predictor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Storage backend: {:?}", config.store.backend);

    // Initialize storage backend
    let (model_store, history) = create_stores(&config.store)?;
    tracing::info!("✅ Storage backend initialized");

    // Create application state for the HTTP API
    let app_state = AppState::new(&config, model_store, history);
    let app = build_router(app_state);
    tracing::info!("✅ Prediction and metrics services initialized");

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Predict:      POST http://{}/v1/predict", http_addr);
    tracing::info!("   Metrics:      GET  http://{}/v1/metrics", http_addr);
    tracing::info!("   History:      GET  http://{}/v1/history", http_addr);
    tracing::info!("   Train:        POST http://{}/v1/train", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn default_config() -> Config {
    use career_predictor::config::*;

    Config {
        server: ServerConfig {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            request_timeout_secs: 30,
        },
        store: StoreConfig {
            backend: StoreBackend::Sled,
            path: Some("./data/store".into()),
            fetch_timeout_secs: 5,
            max_retries: 3,
            retry_backoff_ms: 200,
        },
        history: HistoryConfig::default(),
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "career-predictor".to_string(),
        },
    }
}

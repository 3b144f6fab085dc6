//! CO2 prediction API server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use co2_api::config::ServiceConfig;
use co2_api::{create_router, AppState};

/// CO2 prediction API
#[derive(Parser, Debug)]
#[command(name = "co2-api")]
#[command(about = "Predict CO2 concentration at a point from ERA5 reanalysis data")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8090", env = "CO2_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "CO2_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Directory for cached ERA5 downloads
    #[arg(long, default_value = "era5_data", env = "ERA5_CACHE_DIR")]
    cache_dir: PathBuf,

    /// Prediction bundle (model + target scaler)
    #[arg(long, default_value = "co2_bundle.json", env = "CO2_MODEL_PATH")]
    model: PathBuf,

    /// Fetch settings
    #[arg(long, default_value = "config/era5.yaml", env = "ERA5_SETTINGS")]
    settings: PathBuf,

    /// Credentials file (defaults to ~/.cdsapirc)
    #[arg(long, env = "CDSAPI_RC")]
    cdsapirc: Option<PathBuf>,

    /// Seconds an idle session is kept
    #[arg(long, default_value = "3600", env = "CO2_SESSION_TTL_SECS")]
    session_ttl_secs: u64,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }
    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting CO2 prediction API");

    let config = ServiceConfig {
        cache_dir: args.cache_dir,
        model_path: args.model,
        settings_path: args.settings,
        credentials_path: args.cdsapirc,
        session_ttl: Duration::from_secs(args.session_ttl_secs),
    };
    let state = Arc::new(AppState::from_config(&config).with_metrics(prometheus_handle));

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            sweeper.sweep_sessions(chrono::Utc::now()).await;
        }
    });
    let app = create_router(state);

    let addr: SocketAddr = args.listen.parse().context("Invalid listen address")?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind")?;
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}

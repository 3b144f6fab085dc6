//! ERA5 bundler server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use era5_bundler::{create_router, AppState, BundlerConfig};

#[derive(Parser, Debug)]
#[command(name = "era5-bundler")]
#[command(about = "Download ERA5 files for a date and serve them as one zip")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8091", env = "BUNDLER_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Scratch directory for downloads
    #[arg(long, default_value = "era5_downloads", env = "BUNDLER_WORK_DIR")]
    work_dir: PathBuf,

    /// CSV download log
    #[arg(long, default_value = "download_log.csv", env = "BUNDLER_LOG_PATH")]
    download_log: PathBuf,

    /// Fetch settings
    #[arg(long, default_value = "config/era5.yaml", env = "ERA5_SETTINGS")]
    settings: PathBuf,

    /// Credentials file (defaults to ~/.cdsapirc)
    #[arg(long, env = "CDSAPI_RC")]
    cdsapirc: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .init();

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting ERA5 bundler");

    let config = BundlerConfig {
        work_dir: args.work_dir,
        log_path: args.download_log,
        settings_path: args.settings,
        credentials_path: args.cdsapirc,
    };
    let state = Arc::new(AppState::from_config(&config).with_metrics(prometheus_handle));
    let app = create_router(state);

    let addr: SocketAddr = args.listen.parse().context("Invalid listen address")?;
    info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind")?;
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}

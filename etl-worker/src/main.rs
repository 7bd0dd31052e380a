use anyhow::{Context, Result};
use etl_worker::clock::{SystemClock, TokioSleeper};
use etl_worker::{ApiClient, Scheduler, SyncOrchestrator, TokenManager, WorkerConfig};
use std::sync::Arc;
use themepark_times::ParkStore;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "etl_worker=info,themepark_times=info".into()),
        )
        .init();

    info!("ETL worker starting...");

    let config = WorkerConfig::from_env().context("Failed to load configuration")?;

    info!(
        api_base_url = %config.api_base_url,
        auth_url = %config.auth_url,
        db_path = %config.store.db_path,
        experiences_interval_secs = config.experiences_interval_secs,
        schedules_interval_secs = config.schedules_interval_secs,
        "Configuration loaded"
    );

    let store = Arc::new(ParkStore::open(&config.store).context("Failed to open park store")?);
    info!("Park store initialized");

    let http_client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let tokens = Arc::new(TokenManager::new(
        http_client.clone(),
        config.auth_url.clone(),
        config.client_id.clone(),
        Arc::new(SystemClock),
    ));
    let client = Arc::new(ApiClient::new(
        http_client,
        config.api_base_url.clone(),
        tokens,
        Arc::new(TokioSleeper),
    ));

    let orchestrator = Arc::new(SyncOrchestrator::new(client, store));
    let scheduler = Scheduler::new(
        orchestrator,
        config.experiences_interval(),
        config.schedules_interval(),
    );

    // Jobs run until a shutdown signal arrives
    tokio::select! {
        _ = scheduler.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl_c signal")?;
            info!("Shutdown signal received");
        }
    }

    info!("ETL worker stopped");
    Ok(())
}

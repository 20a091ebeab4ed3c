//! pickup-server: order intake backend for a food-pickup storefront

use pickup_server::{AppState, Config, api, logger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Interval between sweeps of expired webhook ids and reservations
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    logger::init_logger(&config.log);

    tracing::info!(
        environment = %config.environment,
        admission_mode = ?config.admission_mode,
        "Starting pickup-server"
    );

    let http_port = config.http_port;
    let state = AppState::new(config)?;
    let capacity = state.checker.capacity();
    tracing::info!(
        slots = capacity.slots().count(),
        default_max = capacity.default_max(),
        "Capacity table loaded"
    );
    let app = api::create_router(state.clone());

    // Periodic cleanup (every 5 minutes)
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.sweep();
        }
    });

    let http_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("pickup-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("pickup-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

//! Booking HTTP server.
//!
//! Serves the booking API on `HOST:PORT` and Prometheus metrics on
//! `METRICS_ADDR`, and drains in-flight requests on SIGINT/SIGTERM.

use anyhow::Context;
use hotel_booking_app::lifecycle::{
    init_tracing, probe_router, serve_until, spawn_signal_listener, wait_for,
};
use hotel_booking_app::{Config, HttpInventoryClient};
use hotel_booking_postgres::{PostgresBookingRepository, migrations};
use hotel_booking_redpanda::RedpandaEventBus;
use hotel_booking_runtime::metrics::MetricsServer;
use hotel_booking_runtime::{BookingOrchestrator, EventPublisher};
use hotel_booking_web::{AppState, router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info,tower_http=debug");

    info!("Starting booking server");
    let config = Config::from_env();
    info!(
        inventory_url = %config.inventory.url,
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new(config.server.metrics_addr()?);
    metrics.start()?;

    info!("Connecting to PostgreSQL...");
    let repository = PostgresBookingRepository::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.connect_timeout,
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    migrations::run(repository.pool())
        .await
        .context("Failed to apply schema")?;

    let inventory = HttpInventoryClient::new(&config.inventory.url, config.inventory.timeout)?;

    // One producer for the whole process.
    let event_bus = RedpandaEventBus::builder()
        .brokers(config.kafka.brokers.as_str())
        .producer_acks(config.kafka.producer_acks.as_str())
        .build()
        .context("Failed to create Redpanda producer")?;

    let orchestrator = BookingOrchestrator::new(
        Arc::new(inventory),
        Arc::new(repository),
        EventPublisher::new(Arc::new(event_bus)),
        config.orchestrator(),
    );

    let mut state = AppState::new(Arc::new(orchestrator));
    if let Some(handle) = metrics.handle() {
        state = state.with_metrics(handle.clone());
    }

    let shutdown = spawn_signal_listener();

    let metrics_listener = TcpListener::bind(metrics.addr())
        .await
        .with_context(|| format!("Failed to bind metrics listener on {}", metrics.addr()))?;
    let metrics_server = tokio::spawn(serve_until(
        metrics_listener,
        probe_router(metrics.handle().cloned()),
        wait_for(shutdown.subscribe()),
        Duration::from_secs(1),
    ));

    let addr = config.server.addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let served = serve_until(
        listener,
        router(state),
        wait_for(shutdown.subscribe()),
        config.server.shutdown_timeout,
    )
    .await;

    // Stop the metrics listener too if the API server failed on its own.
    let _ = shutdown.send(());
    match metrics_server.await {
        Ok(Err(e)) => warn!(error = %e, "Metrics server failed"),
        Err(e) => warn!(error = %e, "Metrics server task failed"),
        Ok(Ok(())) => {}
    }

    served?;
    info!("Booking server stopped");
    Ok(())
}

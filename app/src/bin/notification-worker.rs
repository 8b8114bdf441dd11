//! Notification worker.
//!
//! Joins the booking consumer group with `CONSUMER_WORKERS` workers and mails
//! a confirmation per booking event. Health, metrics and `POST /html_email`
//! are served on `METRICS_ADDR`. On SIGINT/SIGTERM the workers stop polling and finish the
//! message in hand within `SHUTDOWN_TIMEOUT`.

use anyhow::Context;
use hotel_booking_app::lifecycle::{
    init_tracing, probe_router, serve_until, spawn_signal_listener, wait_for,
};
use hotel_booking_app::{Config, SmtpMailTransport, TemplateRenderer, email_router};
use hotel_booking_postgres::{PostgresBookingRepository, PostgresDeadLetterQueue, migrations};
use hotel_booking_redpanda::RedpandaEventBus;
use hotel_booking_runtime::metrics::MetricsServer;
use hotel_booking_runtime::{ConsumerGroupRuntime, NotificationDispatcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    info!("Starting notification worker");
    let config = Config::from_env();
    info!(
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        group_id = %config.kafka.consumer_group,
        workers = config.kafka.workers,
        dead_letters = config.notification.dead_letter_enabled,
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new(config.server.metrics_addr()?);
    metrics.start()?;

    let mut renderer = TemplateRenderer::default();
    if let Some(dir) = &config.notification.template_dir {
        renderer = renderer
            .load_dir(dir)
            .with_context(|| format!("Failed to load templates from {}", dir.display()))?;
    }
    if !renderer.contains(&config.notification.template) {
        anyhow::bail!(
            "Notification template '{}' is not defined",
            config.notification.template
        );
    }

    let renderer = Arc::new(renderer);
    let transport = Arc::new(SmtpMailTransport::new(&config.smtp)?);
    let dispatcher = NotificationDispatcher::new(renderer.clone(), transport.clone())
        .with_template(config.notification.template.as_str())
        .with_subject(config.notification.subject.as_str());

    let event_bus = RedpandaEventBus::builder()
        .brokers(config.kafka.brokers.as_str())
        .auto_offset_reset("earliest")
        .build()
        .context("Failed to create Redpanda client")?;

    let mut runtime =
        ConsumerGroupRuntime::new(Arc::new(event_bus), Arc::new(dispatcher), config.consumer());

    if config.notification.dead_letter_enabled {
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
        let queue = PostgresDeadLetterQueue::new(repository.pool().clone());
        runtime = runtime.with_dead_letters(Arc::new(queue));
    }

    let running = runtime.start();

    let shutdown = spawn_signal_listener();
    let listener = TcpListener::bind(metrics.addr())
        .await
        .with_context(|| format!("Failed to bind probe listener on {}", metrics.addr()))?;
    let served = serve_until(
        listener,
        probe_router(metrics.handle().cloned()).merge(email_router(renderer, transport)),
        wait_for(shutdown.subscribe()),
        Duration::from_secs(1),
    )
    .await;

    for stats in running.shutdown().await {
        info!(
            worker = stats.worker,
            consumed = stats.consumed,
            dispatched = stats.dispatched,
            decode_failures = stats.decode_failures,
            dispatch_failures = stats.dispatch_failures,
            dead_lettered = stats.dead_lettered,
            "Worker finished"
        );
    }

    served?;
    info!("Notification worker stopped");
    Ok(())
}

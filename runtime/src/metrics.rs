//! Prometheus metrics for the booking pipeline.
//!
//! Counters and histograms are recorded through the `metrics` facade. A
//! [`MetricsServer`] installs the Prometheus recorder once per process and
//! renders the scrape body; the binaries serve it over HTTP.
//!
//! # Example
//!
//! ```rust,no_run
//! use hotel_booking_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! let body = server.render();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should be bound to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe every metric and install the Prometheus recorder.
    ///
    /// If another recorder is already installed (several servers in one test
    /// binary) this logs a warning and leaves [`handle`](Self::handle) empty.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                register_metrics();
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(BuildError::FailedToSetGlobalRecorder(_)) => {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                Ok(())
            }
            Err(e) => Err(MetricsError::Install(e.to_string())),
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    // Booking creation
    describe_counter!("bookings_created_total", "Bookings persisted");
    describe_counter!(
        "bookings_rejected_total",
        "Booking requests rejected, labelled by error kind"
    );
    describe_histogram!(
        "booking_duration_seconds",
        "Time taken to run one booking creation"
    );

    // Publishing
    describe_counter!("events_published_total", "Booking events handed to the broker");
    describe_counter!(
        "event_publish_failures_total",
        "Booking events the broker did not accept"
    );

    // Notification consumer
    describe_counter!("notifications_consumed_total", "Messages read by consumer workers");
    describe_counter!("notifications_dispatched_total", "Notifications sent");
    describe_counter!(
        "notifications_decode_failures_total",
        "Messages skipped because the payload did not decode"
    );
    describe_counter!(
        "notifications_dispatch_failures_total",
        "Messages whose notification could not be rendered or sent"
    );
    describe_counter!(
        "notifications_dead_lettered_total",
        "Messages recorded in the dead-letter sink"
    );
}

/// Booking creation metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record a persisted booking.
    pub fn record_created(duration: Duration) {
        counter!("bookings_created_total").increment(1);
        histogram!("booking_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a rejected request by error code.
    pub fn record_rejected(code: &'static str, duration: Duration) {
        counter!("bookings_rejected_total", "kind" => code).increment(1);
        histogram!("booking_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Event publishing metrics recorder.
pub struct PublishMetrics;

impl PublishMetrics {
    /// Record a publish.
    pub fn record_published() {
        counter!("events_published_total").increment(1);
    }

    /// Record a publish failure.
    pub fn record_failure() {
        counter!("event_publish_failures_total").increment(1);
    }
}

/// Notification consumer metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a message read from the broker.
    pub fn record_consumed() {
        counter!("notifications_consumed_total").increment(1);
    }

    /// Record a sent notification.
    pub fn record_dispatched() {
        counter!("notifications_dispatched_total").increment(1);
    }

    /// Record a payload that failed to decode.
    pub fn record_decode_failure() {
        counter!("notifications_decode_failures_total").increment(1);
    }

    /// Record a failed dispatch.
    pub fn record_dispatch_failure() {
        counter!("notifications_dispatch_failures_total").increment(1);
    }

    /// Record a dead-lettered message.
    pub fn record_dead_lettered() {
        counter!("notifications_dead_lettered_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn server_starts_without_handle() {
        let server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[tokio::test]
    async fn start_is_idempotent_across_servers() {
        let mut first = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        let mut second = MetricsServer::new("127.0.0.1:0".parse().unwrap());

        assert!(first.start().is_ok());
        assert!(second.start().is_ok());
        // At most one server in a process owns the recorder.
        assert!(first.handle().is_none() || second.handle().is_none());
    }

    #[tokio::test]
    async fn rendered_output_contains_recorded_counters() {
        let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        server.start().unwrap();

        BookingMetrics::record_created(Duration::from_millis(20));
        BookingMetrics::record_rejected("NO_AVAILABILITY", Duration::from_millis(5));
        NotificationMetrics::record_consumed();

        // Another test may own the recorder; counters are still recorded there.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("bookings_created_total"));
            assert!(rendered.contains("bookings_rejected_total"));
            assert!(rendered.contains("notifications_consumed_total"));
        }
    }
}

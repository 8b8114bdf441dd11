//! Shared handler state.

use hotel_booking_runtime::BookingOrchestrator;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Booking coordinator
    pub orchestrator: Arc<BookingOrchestrator>,
    /// Prometheus renderer; `/metrics` answers 404 without one
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State without a metrics endpoint.
    #[must_use]
    pub const fn new(orchestrator: Arc<BookingOrchestrator>) -> Self {
        Self {
            orchestrator,
            metrics: None,
        }
    }

    /// Serve `handle` on `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }
}

//! Serializes booking events and hands them to the broker.

use crate::metrics::PublishMetrics;
use hotel_booking_core::event::BookingCreatedEvent;
use hotel_booking_core::event_bus::EventBus;
use hotel_booking_core::BookingError;
use std::sync::Arc;

/// Publishes [`BookingCreatedEvent`]s through a shared broker handle.
///
/// One publisher (and one underlying producer) lives for the whole process.
/// No outbox ties a publish to the storage write that preceded it.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
}

impl EventPublisher {
    /// Create a publisher over `bus`.
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Encode `event` and hand it to the broker for `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::PublishFailed`] if encoding fails or the broker
    /// client does not accept the payload.
    #[tracing::instrument(skip(self, event), fields(booking_id = %event.booking_id))]
    pub async fn publish(&self, event: &BookingCreatedEvent, topic: &str) -> Result<(), BookingError> {
        let result = async {
            let payload = event.to_payload().map_err(|e| e.to_string())?;
            self.bus
                .publish(topic, &payload)
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(()) => {
                PublishMetrics::record_published();
                tracing::debug!(topic, "Booking event published");
                Ok(())
            }
            Err(reason) => {
                PublishMetrics::record_failure();
                Err(BookingError::PublishFailed {
                    topic: topic.to_string(),
                    reason,
                })
            }
        }
    }
}

//! # Hotel Booking Runtime
//!
//! The booking pipeline, independent of any concrete broker, database or mail
//! server:
//!
//! - [`orchestrator`]: `BookingOrchestrator`, which creates bookings
//! - [`availability`]: room selection
//! - [`publisher`]: `EventPublisher`, which emits booking events
//! - [`consumer`]: `ConsumerGroupRuntime`, the notification workers
//! - [`dispatcher`]: `NotificationDispatcher`, which renders and sends confirmations
//! - [`retry`]: exponential backoff around dispatch
//! - [`metrics`]: Prometheus metrics
//!
//! # Example
//!
//! ```rust,ignore
//! let publisher = EventPublisher::new(event_bus);
//! let orchestrator = BookingOrchestrator::new(
//!     inventory,
//!     repository,
//!     publisher,
//!     OrchestratorConfig::default(),
//! );
//!
//! let booking_id = orchestrator.create_booking(&request).await?;
//! ```

pub mod availability;
pub mod consumer;
pub mod dispatcher;
pub mod metrics;
pub mod orchestrator;
pub mod publisher;
pub mod retry;

pub use availability::{Availability, AvailabilityResolver, CandidateOrder};
pub use consumer::{
    ConsumerGroupRuntime, ConsumerSettings, RunningConsumerGroup, WorkerState, WorkerStats,
};
pub use dispatcher::NotificationDispatcher;
pub use orchestrator::{BookingOrchestrator, OrchestratorConfig};
pub use publisher::EventPublisher;
pub use retry::RetryPolicy;

//! Booking creation.
//!
//! [`BookingOrchestrator::create_booking`] runs the booking steps in order:
//!
//! 1. validate the stay
//! 2. fetch the nightly price
//! 3. compute nights and total
//! 4. fetch candidate rooms
//! 5. fetch occupied rooms for the stay
//! 6. pick a free room
//! 7. persist the booking
//! 8. publish `BookingCreatedEvent`
//!
//! Nothing is compensated. Steps 2 to 6 write nothing, so an abort there
//! leaves no trace. Step 8 failing does not fail the call: the booking is
//! already durable and the caller gets its identifier.
//!
//! Every remote call is bounded by a timeout. A timeout is reported as the
//! `...Unavailable` kind of its collaborator, never as a domain rejection.

use crate::availability::{Availability, AvailabilityResolver, CandidateOrder};
use crate::metrics::BookingMetrics;
use crate::publisher::EventPublisher;
use hotel_booking_core::booking::{
    Booking, BookingId, BookingRequest, HotelId, NewBooking, User, UserId,
};
use hotel_booking_core::event::BookingCreatedEvent;
use hotel_booking_core::inventory::{InventoryClient, InventoryError};
use hotel_booking_core::repository::{BookingRepository, RepositoryError};
use hotel_booking_core::BookingError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Topic booking events are published to unless configured otherwise.
pub const DEFAULT_TOPIC: &str = "booking-created";

/// Orchestrator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Topic for `BookingCreatedEvent`
    pub topic: String,
    /// Bound on each inventory call
    pub inventory_timeout: Duration,
    /// Bound on each storage call
    pub storage_timeout: Duration,
    /// Candidate scan order for room selection
    pub candidate_order: CandidateOrder,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            inventory_timeout: Duration::from_secs(5),
            storage_timeout: Duration::from_secs(5),
            candidate_order: CandidateOrder::AsReceived,
        }
    }
}

/// Coordinates inventory, storage and publishing to create bookings.
///
/// Holds only shared read-only handles; every call is request-scoped, so one
/// orchestrator serves any number of concurrent requests.
///
/// No lock spans "read occupancy then write". Two concurrent requests may
/// both pick the same room; storage rejects the second write with a conflict,
/// which surfaces as [`BookingError::NoAvailability`].
#[derive(Clone)]
pub struct BookingOrchestrator {
    inventory: Arc<dyn InventoryClient>,
    repository: Arc<dyn BookingRepository>,
    publisher: EventPublisher,
    resolver: AvailabilityResolver,
    config: OrchestratorConfig,
}

impl BookingOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        inventory: Arc<dyn InventoryClient>,
        repository: Arc<dyn BookingRepository>,
        publisher: EventPublisher,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inventory,
            repository,
            publisher,
            resolver: AvailabilityResolver::new(config.candidate_order),
            config,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Create a booking and return its identifier.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidDateRange`] if check-out is not after check-in;
    ///   no remote call is made
    /// - [`BookingError::PriceNotFound`] / [`BookingError::NoRoomsOfType`] if
    ///   inventory has no such room type
    /// - [`BookingError::InventoryUnavailable`] if inventory fails or times out
    /// - [`BookingError::NoAvailability`] if every candidate is taken, or storage
    ///   rejects the write as overlapping
    /// - [`BookingError::StorageUnavailable`] if storage fails or times out
    #[tracing::instrument(
        skip(self, request),
        fields(
            user_id = %request.user_id,
            hotel_id = %request.hotel_id,
            room_type_id = %request.room_type_id,
        )
    )]
    pub async fn create_booking(&self, request: &BookingRequest) -> Result<BookingId, BookingError> {
        let started = Instant::now();
        let result = self.run(request).await;

        match &result {
            Ok(booking_id) => {
                BookingMetrics::record_created(started.elapsed());
                tracing::info!(booking_id = %booking_id, "Booking created");
            }
            Err(err) if err.is_client_error() => {
                BookingMetrics::record_rejected(err.code(), started.elapsed());
                tracing::info!(code = err.code(), error = %err, "Booking rejected");
            }
            Err(err) => {
                BookingMetrics::record_rejected(err.code(), started.elapsed());
                tracing::error!(code = err.code(), error = %err, "Booking failed");
            }
        }

        result
    }

    async fn run(&self, request: &BookingRequest) -> Result<BookingId, BookingError> {
        let hotel_id = request.hotel_id;
        let room_type_id = request.room_type_id;

        let stay = request.stay()?;

        let quote = self
            .inventory_call(self.inventory.get_price(hotel_id, room_type_id))
            .await
            .map_err(|err| match err {
                InventoryError::NotFound { .. } => BookingError::PriceNotFound {
                    hotel_id,
                    room_type_id,
                },
                other => BookingError::InventoryUnavailable(other.to_string()),
            })?;

        let nights = stay.nights();
        if nights <= 0 {
            return Err(BookingError::InvalidDateRange {
                check_in: request.check_in,
                check_out: request.check_out,
            });
        }
        let total_price = quote.total_for(nights);

        let candidates = self
            .inventory_call(self.inventory.get_room_candidates(hotel_id, room_type_id))
            .await
            .map_err(|err| match err {
                InventoryError::NotFound { .. } => BookingError::NoRoomsOfType {
                    hotel_id,
                    room_type_id,
                },
                other => BookingError::InventoryUnavailable(other.to_string()),
            })?;
        if candidates.is_empty() {
            return Err(BookingError::NoRoomsOfType {
                hotel_id,
                room_type_id,
            });
        }

        let occupied = self
            .storage_call(self.repository.occupied_rooms(&stay))
            .await
            .map_err(storage_unavailable)?;

        let room_id = match self.resolver.resolve(&candidates, &occupied) {
            Availability::Free(room_id) => room_id,
            Availability::Exhausted => {
                return Err(BookingError::NoAvailability {
                    hotel_id,
                    room_type_id,
                });
            }
        };
        tracing::debug!(
            room_id = %room_id,
            candidates = candidates.len(),
            occupied = occupied.len(),
            "Room selected"
        );

        let new_booking = NewBooking {
            user_id: request.user_id,
            hotel_id,
            room_id,
            stay,
            guests_count: request.guests_count,
            total_price,
        };
        let booking_id = self
            .storage_call(self.repository.create_booking(&new_booking))
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict { .. } => BookingError::NoAvailability {
                    hotel_id,
                    room_type_id,
                },
                other => storage_unavailable(other),
            })?;

        let booking = new_booking.with_id(booking_id);
        let event =
            BookingCreatedEvent::from_booking(&booking, &request.user_email, &request.user_name);
        if let Err(err) = self.publisher.publish(&event, &self.config.topic).await {
            tracing::warn!(
                booking_id = %booking_id,
                error = %err,
                "Booking persisted but its event was not published"
            );
        }

        Ok(booking_id)
    }

    /// A user's bookings, most recent check-in first.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StorageUnavailable`] if storage fails or times out.
    pub async fn user_bookings(&self, user_id: UserId) -> Result<Vec<Booking>, BookingError> {
        self.storage_call(self.repository.user_bookings(user_id))
            .await
            .map_err(storage_unavailable)
    }

    /// A hotel's bookings, most recent check-in first.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StorageUnavailable`] if storage fails or times out.
    pub async fn hotel_bookings(&self, hotel_id: HotelId) -> Result<Vec<Booking>, BookingError> {
        self.storage_call(self.repository.hotel_bookings(hotel_id))
            .await
            .map_err(storage_unavailable)
    }

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StorageUnavailable`] if storage fails or times out.
    pub async fn find_user(&self, user_id: UserId) -> Result<Option<User>, BookingError> {
        self.storage_call(self.repository.find_user(user_id))
            .await
            .map_err(storage_unavailable)
    }

    async fn inventory_call<T>(
        &self,
        call: impl Future<Output = Result<T, InventoryError>>,
    ) -> Result<T, InventoryError> {
        timeout(self.config.inventory_timeout, call)
            .await
            .unwrap_or(Err(InventoryError::Timeout))
    }

    async fn storage_call<T>(
        &self,
        call: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, RepositoryError> {
        timeout(self.config.storage_timeout, call)
            .await
            .unwrap_or(Err(RepositoryError::Timeout))
    }
}

fn storage_unavailable(err: RepositoryError) -> BookingError {
    match err {
        RepositoryError::Unavailable(reason) => BookingError::StorageUnavailable(reason),
        RepositoryError::Timeout => BookingError::StorageUnavailable("call timed out".to_string()),
        other => BookingError::StorageUnavailable(other.to_string()),
    }
}

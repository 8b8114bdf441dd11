//! Durable storage for bookings and users.
//!
//! Storage is the final arbiter of room allocation: two bookings for the same
//! room with overlapping stays are never both accepted. Implementations reject
//! the second writer with [`RepositoryError::Conflict`].

use crate::booking::{
    Booking, BookingId, HotelId, NewBooking, OccupancySet, RoomId, Stay, User, UserId,
};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors returned by a [`BookingRepository`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Storage could not be reached or failed
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time
    #[error("Storage call timed out")]
    Timeout,

    /// The room is already booked for an overlapping stay
    #[error("Room {room_id} is already booked for an overlapping stay {stay}")]
    Conflict {
        /// Room that was contended
        room_id: RoomId,
        /// Stay that was rejected
        stay: Stay,
    },

    /// A referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Booking storage.
pub trait BookingRepository: Send + Sync {
    /// Insert a booking and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the room already has a booking
    /// overlapping the stay, otherwise an availability error.
    fn create_booking(
        &self,
        booking: &NewBooking,
    ) -> Pin<Box<dyn Future<Output = Result<BookingId, RepositoryError>> + Send + '_>>;

    /// Rooms with at least one booking overlapping `stay`.
    ///
    /// The set is not filtered by hotel or room type; callers intersect it with
    /// their own candidates.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Unavailable`] if storage fails.
    fn occupied_rooms(
        &self,
        stay: &Stay,
    ) -> Pin<Box<dyn Future<Output = Result<OccupancySet, RepositoryError>> + Send + '_>>;

    /// A user's bookings, most recent check-in first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Unavailable`] if storage fails.
    fn user_bookings(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, RepositoryError>> + Send + '_>>;

    /// A hotel's bookings, most recent check-in first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Unavailable`] if storage fails.
    fn hotel_bookings(
        &self,
        hotel_id: HotelId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, RepositoryError>> + Send + '_>>;

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Unavailable`] if storage fails.
    fn find_user(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<User>, RepositoryError>> + Send + '_>>;
}

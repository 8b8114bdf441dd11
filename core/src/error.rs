//! Booking error taxonomy.
//!
//! Every failure the booking pipeline can surface maps onto one [`BookingError`]
//! kind. Validation and domain kinds are client errors; infrastructure kinds are
//! server errors; the consumer-side kinds never reach a caller and only appear
//! in logs, metrics and dead-letter records.

use crate::booking::{HotelId, RoomTypeId};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced while creating bookings or handling booking events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    /// Check-out is not strictly after check-in
    #[error("Invalid date range: check-out {check_out} must be after check-in {check_in}")]
    InvalidDateRange {
        /// Requested arrival
        check_in: NaiveDate,
        /// Requested departure
        check_out: NaiveDate,
    },

    /// The inventory service could not be reached or timed out
    #[error("Inventory service unavailable: {0}")]
    InventoryUnavailable(String),

    /// The inventory service has no price for the hotel and room type
    #[error("No price for hotel {hotel_id}, room type {room_type_id}")]
    PriceNotFound {
        /// Requested hotel
        hotel_id: HotelId,
        /// Requested room type
        room_type_id: RoomTypeId,
    },

    /// The hotel has no rooms of the requested type
    #[error("Hotel {hotel_id} has no rooms of type {room_type_id}")]
    NoRoomsOfType {
        /// Requested hotel
        hotel_id: HotelId,
        /// Requested room type
        room_type_id: RoomTypeId,
    },

    /// Every room of the requested type is occupied for the requested dates
    #[error("No room of type {room_type_id} in hotel {hotel_id} is free for the requested dates")]
    NoAvailability {
        /// Requested hotel
        hotel_id: HotelId,
        /// Requested room type
        room_type_id: RoomTypeId,
    },

    /// Storage could not be reached, failed, or timed out
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The booking event could not be handed to the broker (non-fatal)
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// Target topic
        topic: String,
        /// Broker or serialization error
        reason: String,
    },

    /// A consumed payload was not a valid booking event
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// Rendering or sending a notification failed
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),
}

impl BookingError {
    /// Stable machine-readable code for this kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::InventoryUnavailable(_) => "INVENTORY_UNAVAILABLE",
            Self::PriceNotFound { .. } => "PRICE_NOT_FOUND",
            Self::NoRoomsOfType { .. } => "NO_ROOMS_OF_TYPE",
            Self::NoAvailability { .. } => "NO_AVAILABILITY",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::PublishFailed { .. } => "PUBLISH_FAILED",
            Self::DecodeFailed(_) => "DECODE_FAILED",
            Self::DispatchFailed(_) => "DISPATCH_FAILED",
        }
    }

    /// Whether the caller is at fault (4xx-class) rather than infrastructure (5xx-class).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDateRange { .. }
                | Self::PriceNotFound { .. }
                | Self::NoRoomsOfType { .. }
                | Self::NoAvailability { .. }
        )
    }
}

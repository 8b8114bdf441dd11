//! The remote inventory service.
//!
//! Inventory owns prices and the list of physical rooms per hotel and room type.
//! The booking side only reads from it.

use crate::booking::{HotelId, PriceQuote, RoomCandidates, RoomTypeId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors returned by an [`InventoryClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The service could not be reached or answered with a server error
    #[error("Inventory transport error: {0}")]
    Transport(String),

    /// The service has no record for the hotel and room type
    #[error("Hotel {hotel_id} has no room type {room_type_id}")]
    NotFound {
        /// Requested hotel
        hotel_id: HotelId,
        /// Requested room type
        room_type_id: RoomTypeId,
    },

    /// The call did not complete in time
    #[error("Inventory call timed out")]
    Timeout,
}

/// Read access to the inventory service.
pub trait InventoryClient: Send + Sync {
    /// Nightly price for a hotel room type.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] if no price exists, otherwise a
    /// transport or timeout error.
    fn get_price(
        &self,
        hotel_id: HotelId,
        room_type_id: RoomTypeId,
    ) -> Pin<Box<dyn Future<Output = Result<PriceQuote, InventoryError>> + Send + '_>>;

    /// Rooms of a type in a hotel, in service order.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] if the hotel or room type is
    /// unknown, otherwise a transport or timeout error.
    fn get_room_candidates(
        &self,
        hotel_id: HotelId,
        room_type_id: RoomTypeId,
    ) -> Pin<Box<dyn Future<Output = Result<RoomCandidates, InventoryError>> + Send + '_>>;
}

//! The `BookingCreatedEvent` wire payload.
//!
//! The payload is UTF-8 JSON with stable snake-case field names. Dates travel as
//! `YYYY-MM-DD` strings. Unknown fields are ignored on decode so producers can
//! add fields without breaking running consumers.
//!
//! # Example
//!
//! ```
//! use hotel_booking_core::event::BookingCreatedEvent;
//!
//! let payload = br#"{
//!     "booking_id": 7,
//!     "user_email": "ada@example.com",
//!     "user_name": "Ada",
//!     "amount": 300.0,
//!     "check_in_date": "2024-01-01",
//!     "check_out_date": "2024-01-04"
//! }"#;
//!
//! let event = BookingCreatedEvent::from_payload(payload).unwrap();
//! assert_eq!(event.booking_id.get(), 7);
//! ```

use crate::booking::{Booking, BookingId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for event encoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// Fact that a booking was persisted, handed to the broker for notification.
///
/// Once emitted the event is owned by the publishing side only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCreatedEvent {
    /// Persisted booking identifier
    pub booking_id: BookingId,
    /// Recipient of the confirmation
    pub user_email: String,
    /// Name used in the confirmation
    pub user_name: String,
    /// Total price of the stay
    pub amount: f64,
    /// Arrival date
    #[serde(rename = "check_in_date")]
    pub check_in: NaiveDate,
    /// Departure date
    #[serde(rename = "check_out_date")]
    pub check_out: NaiveDate,
}

impl BookingCreatedEvent {
    /// Build the event for a freshly persisted booking.
    #[must_use]
    pub fn from_booking(
        booking: &Booking,
        user_email: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            booking_id: booking.id,
            user_email: user_email.into(),
            user_name: user_name.into(),
            amount: booking.total_price,
            check_in: booking.check_in,
            check_out: booking.check_out,
        }
    }

    /// Encode as the broker payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if encoding fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Decode a broker payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes are not a valid event.
    pub fn from_payload(bytes: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::booking::{HotelId, RoomId, UserId};

    fn booking() -> Booking {
        Booking {
            id: BookingId::new(12),
            user_id: UserId::new(1),
            hotel_id: HotelId::new(1),
            room_id: RoomId::new(102),
            check_in: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            guests_count: 2,
            total_price: 300.0,
        }
    }

    #[test]
    fn payload_uses_stable_field_names() {
        let event = BookingCreatedEvent::from_booking(&booking(), "ada@example.com", "Ada");
        let payload = event.to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        assert_eq!(value["booking_id"], 12);
        assert_eq!(value["user_email"], "ada@example.com");
        assert_eq!(value["user_name"], "Ada");
        assert_eq!(value["amount"], 300.0);
        assert_eq!(value["check_in_date"], "2024-01-01");
        assert_eq!(value["check_out_date"], "2024-01-04");
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let payload = br#"{"booking_id":3,"user_email":"a@b.c","user_name":"A","hotel_name":"Grand",
            "amount":10.5,"check_in_date":"2024-05-01","check_out_date":"2024-05-02"}"#;
        let event = BookingCreatedEvent::from_payload(payload).unwrap();
        assert_eq!(event.booking_id, BookingId::new(3));
        assert!((event.amount - 10.5).abs() < f64::EPSILON);
    }

    #[test]
    fn camel_case_keys_are_not_accepted() {
        let payload = br#"{"bookingID":3,"userEmail":"a@b.c","userName":"A",
            "amount":10.5,"checkIn":"2024-05-01","checkOut":"2024-05-02"}"#;
        let result = BookingCreatedEvent::from_payload(payload);
        assert!(matches!(result, Err(EventError::DeserializationError(_))));
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = BookingCreatedEvent::from_payload(b"not json");
        assert!(matches!(result, Err(EventError::DeserializationError(_))));
    }
}

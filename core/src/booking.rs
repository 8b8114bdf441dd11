//! Booking domain types.
//!
//! Identifiers are thin newtypes over the integer keys used by storage and the
//! inventory service. They serialize transparently so wire formats stay plain
//! numbers.

use crate::error::BookingError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Defines an integer-backed identifier newtype.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// The raw identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a persisted booking.
    BookingId
);
numeric_id!(
    /// Identifier of a registered user.
    UserId
);
numeric_id!(
    /// Identifier of a hotel in the inventory service.
    HotelId
);
numeric_id!(
    /// Identifier of a room type within a hotel.
    RoomTypeId
);
numeric_id!(
    /// Identifier of a physical room.
    RoomId
);

/// Ordered room identifiers returned by the inventory service for a hotel and room type.
///
/// The order is whatever the inventory service returned; it is not guaranteed
/// to be stable across calls.
pub type RoomCandidates = Vec<RoomId>;

/// Rooms occupied by at least one booking overlapping a requested stay.
pub type OccupancySet = HashSet<RoomId>;

/// A validated half-open date interval `[check_in, check_out)`.
///
/// Construction fails unless `check_out` is strictly after `check_in`, so a
/// `Stay` always spans at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stay {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl Stay {
    /// Create a stay.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidDateRange`] if `check_out <= check_in`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, BookingError> {
        if check_out <= check_in {
            return Err(BookingError::InvalidDateRange {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// First night of the stay.
    #[must_use]
    pub const fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    /// Departure day (exclusive).
    #[must_use]
    pub const fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights: whole 24-hour periods between check-in and check-out.
    #[must_use]
    pub fn nights(&self) -> i64 {
        self.check_out.signed_duration_since(self.check_in).num_hours() / 24
    }

    /// Half-open interval overlap.
    ///
    /// Two stays overlap unless one ends on or before the day the other begins.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(other.check_out <= self.check_in || other.check_in >= self.check_out)
    }
}

impl fmt::Display for Stay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}

/// Price per night for a hotel room type, as quoted by the inventory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Price of a single night
    pub price_per_night: f64,
    /// ISO currency code (e.g. "USD")
    pub currency: String,
}

impl PriceQuote {
    /// Create a quote.
    #[must_use]
    pub fn new(price_per_night: f64, currency: impl Into<String>) -> Self {
        Self {
            price_per_night,
            currency: currency.into(),
        }
    }

    /// Total for the given number of nights.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // night counts are far below 2^52
    pub fn total_for(&self, nights: i64) -> f64 {
        self.price_per_night * nights as f64
    }
}

/// A request to reserve one room of a given type for a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Who is booking
    pub user_id: UserId,
    /// Hotel to book in
    pub hotel_id: HotelId,
    /// Requested room type
    pub room_type_id: RoomTypeId,
    /// Arrival date
    pub check_in: NaiveDate,
    /// Departure date (exclusive)
    pub check_out: NaiveDate,
    /// Number of guests
    pub guests_count: u32,
    /// Where the confirmation goes
    pub user_email: String,
    /// Name used in the confirmation
    pub user_name: String,
}

impl BookingRequest {
    /// Validate and return the requested stay.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidDateRange`] if check-out is not after check-in.
    pub fn stay(&self) -> Result<Stay, BookingError> {
        Stay::new(self.check_in, self.check_out)
    }
}

/// A booking about to be written; storage assigns the identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    /// Who booked
    pub user_id: UserId,
    /// Hotel booked
    pub hotel_id: HotelId,
    /// Assigned room
    pub room_id: RoomId,
    /// Booked interval
    pub stay: Stay,
    /// Number of guests
    pub guests_count: u32,
    /// `price_per_night * nights`
    pub total_price: f64,
}

impl NewBooking {
    /// Attach the storage-assigned identifier.
    #[must_use]
    pub const fn with_id(self, id: BookingId) -> Booking {
        Booking {
            id,
            user_id: self.user_id,
            hotel_id: self.hotel_id,
            room_id: self.room_id,
            check_in: self.stay.check_in,
            check_out: self.stay.check_out,
            guests_count: self.guests_count,
            total_price: self.total_price,
        }
    }
}

/// A persisted booking. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Storage-assigned identifier
    pub id: BookingId,
    /// Who booked
    pub user_id: UserId,
    /// Hotel booked
    pub hotel_id: HotelId,
    /// Assigned room
    pub room_id: RoomId,
    /// Arrival date
    #[serde(rename = "check_in_date")]
    pub check_in: NaiveDate,
    /// Departure date (exclusive)
    #[serde(rename = "check_out_date")]
    pub check_out: NaiveDate,
    /// Number of guests
    pub guests_count: u32,
    /// Total charged for the stay
    pub total_price: f64,
}

/// A registered user, as far as notifications are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier
    pub id: UserId,
    /// Contact address
    pub email: String,
    /// Display name
    pub full_name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn stay_rejects_non_positive_ranges() {
        assert!(Stay::new(date(2024, 1, 4), date(2024, 1, 1)).is_err());
        assert!(matches!(
            Stay::new(date(2024, 1, 1), date(2024, 1, 1)),
            Err(BookingError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn price_is_exact_for_three_nights() {
        let stay = Stay::new(date(2024, 1, 1), date(2024, 1, 4)).unwrap();
        assert_eq!(stay.nights(), 3);

        let quote = PriceQuote::new(100.0, "USD");
        assert!((quote.total_for(stay.nights()) - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overlapping_stays_share_a_night() {
        let existing = Stay::new(date(2024, 3, 10), date(2024, 3, 15)).unwrap();
        let request = Stay::new(date(2024, 3, 14), date(2024, 3, 16)).unwrap();
        assert!(existing.overlaps(&request));
        assert!(request.overlaps(&existing));
    }

    #[test]
    fn back_to_back_stays_do_not_overlap() {
        let existing = Stay::new(date(2024, 3, 10), date(2024, 3, 15)).unwrap();
        let request = Stay::new(date(2024, 3, 15), date(2024, 3, 20)).unwrap();
        assert!(!existing.overlaps(&request));
        assert!(!request.overlaps(&existing));
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&BookingId::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn booking_dates_use_long_key_names() {
        let booking = Booking {
            id: BookingId::new(1),
            user_id: UserId::new(1),
            hotel_id: HotelId::new(1),
            room_id: RoomId::new(101),
            check_in: date(2024, 1, 1),
            check_out: date(2024, 1, 4),
            guests_count: 2,
            total_price: 300.0,
        };
        let value = serde_json::to_value(&booking).unwrap();
        assert_eq!(value["check_in_date"], "2024-01-01");
        assert_eq!(value["check_out_date"], "2024-01-04");
        assert!(value.get("check_in").is_none());
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in 0i64..60, la in 1i64..15, b in 0i64..60, lb in 1i64..15) {
            let base = date(2024, 1, 1);
            let first = Stay::new(
                base + chrono::Days::new(a.unsigned_abs()),
                base + chrono::Days::new((a + la).unsigned_abs()),
            ).unwrap();
            let second = Stay::new(
                base + chrono::Days::new(b.unsigned_abs()),
                base + chrono::Days::new((b + lb).unsigned_abs()),
            ).unwrap();
            prop_assert_eq!(first.overlaps(&second), second.overlaps(&first));
            prop_assert_eq!(first.overlaps(&second), a < b + lb && b < a + la);
        }

        #[test]
        fn nights_match_day_difference(offset in 1u64..400) {
            let check_in = date(2024, 2, 27);
            let stay = Stay::new(check_in, check_in + chrono::Days::new(offset)).unwrap();
            prop_assert_eq!(stay.nights(), i64::try_from(offset).unwrap());
        }
    }
}

//! Test data builders.

use chrono::NaiveDate;
use hotel_booking_core::booking::{BookingRequest, HotelId, RoomTypeId, UserId};

/// Build a date, panicking on an invalid one.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A request from user 1 (`guest@example.com`, "Test Guest") for two guests.
#[must_use]
pub fn booking_request(
    hotel_id: i64,
    room_type_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> BookingRequest {
    BookingRequest {
        user_id: UserId::new(1),
        hotel_id: HotelId::new(hotel_id),
        room_type_id: RoomTypeId::new(room_type_id),
        check_in,
        check_out,
        guests_count: 2,
        user_email: "guest@example.com".to_string(),
        user_name: "Test Guest".to_string(),
    }
}

/// Install a test log subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

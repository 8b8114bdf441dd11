//! Booking endpoints.
//!
//! ```text
//! POST /api/bookings                 create a booking
//! GET  /api/users/{id}/bookings      a user's bookings
//! GET  /api/hotels/{id}/bookings     a hotel's bookings
//! ```

use crate::error::AppError;
use crate::extractors::CorrelationId;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::NaiveDate;
use hotel_booking_core::booking::{
    Booking, BookingId, BookingRequest, HotelId, RoomTypeId, Stay, UserId,
};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/bookings`.
///
/// The user's email and name are looked up from storage, not sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingBody {
    /// Guest making the booking
    pub user_id: i64,
    /// Hotel
    pub hotel_id: i64,
    /// Room type
    pub room_type_id: i64,
    /// Arrival, `YYYY-MM-DD`
    #[serde(rename = "check_in_date")]
    pub check_in: NaiveDate,
    /// Departure, `YYYY-MM-DD`
    #[serde(rename = "check_out_date")]
    pub check_out: NaiveDate,
    /// Number of guests
    pub guests_count: u32,
}

/// Response of `POST /api/bookings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedBooking {
    /// Identifier of the new booking
    pub booking_id: BookingId,
}

/// Response of the listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingList {
    /// Bookings, most recent check-in first
    pub bookings: Vec<Booking>,
}

/// Create a booking.
///
/// # Errors
///
/// - 400 `BAD_REQUEST` for a malformed body or a guest count outside
///   `1..=i32::MAX`
/// - 400 `INVALID_DATE_RANGE` before any lookup when check-out is not after
///   check-in
/// - 404 `USER_NOT_FOUND` for an unknown user
/// - any [`hotel_booking_core::BookingError`] mapped by [`AppError`]
pub async fn create_booking(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<CreateBookingBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedBooking>), AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    if body.guests_count == 0 {
        return Err(AppError::bad_request("guests_count must be at least 1"));
    }
    if i32::try_from(body.guests_count).is_err() {
        return Err(AppError::bad_request(format!(
            "guests_count must be at most {}",
            i32::MAX
        )));
    }
    Stay::new(body.check_in, body.check_out)?;

    let user_id = UserId::new(body.user_id);
    let user = state
        .orchestrator
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", format!("User {user_id} not found")))?;

    let request = BookingRequest {
        user_id,
        hotel_id: HotelId::new(body.hotel_id),
        room_type_id: RoomTypeId::new(body.room_type_id),
        check_in: body.check_in,
        check_out: body.check_out,
        guests_count: body.guests_count,
        user_email: user.email,
        user_name: user.full_name,
    };

    let booking_id = state.orchestrator.create_booking(&request).await?;
    tracing::info!(%correlation_id, %booking_id, "Booking request accepted");

    Ok((StatusCode::CREATED, Json(CreatedBooking { booking_id })))
}

/// List a user's bookings.
///
/// # Errors
///
/// 503 `STORAGE_UNAVAILABLE` if storage fails.
pub async fn user_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<BookingList>, AppError> {
    let bookings = state.orchestrator.user_bookings(UserId::new(user_id)).await?;
    Ok(Json(BookingList { bookings }))
}

/// List a hotel's bookings.
///
/// # Errors
///
/// 503 `STORAGE_UNAVAILABLE` if storage fails.
pub async fn hotel_bookings(
    State(state): State<AppState>,
    Path(hotel_id): Path<i64>,
) -> Result<Json<BookingList>, AppError> {
    let bookings = state.orchestrator.hotel_bookings(HotelId::new(hotel_id)).await?;
    Ok(Json(BookingList { bookings }))
}

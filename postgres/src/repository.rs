//! sqlx implementation of `BookingRepository`.

use crate::{EXCLUSION_VIOLATION, storage_error};
use chrono::NaiveDate;
use hotel_booking_core::booking::{
    Booking, BookingId, HotelId, NewBooking, OccupancySet, RoomId, Stay, User, UserId,
};
use hotel_booking_core::repository::{BookingRepository, RepositoryError};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const BOOKING_COLUMNS: &str = "id, user_id, hotel_id, room_id, check_in_date, check_out_date, guests_count, total_price";

/// `PostgreSQL`-backed booking storage.
#[derive(Clone, Debug)]
pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    /// Connect a pool of at most `max_connections`, waiting up to
    /// `acquire_timeout` for a connection.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Unavailable`] if the database cannot be reached.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert(&self, booking: &NewBooking) -> Result<BookingId, RepositoryError> {
        let guests = i32::try_from(booking.guests_count).map_err(|_| {
            RepositoryError::Unavailable(format!(
                "guests_count {} out of range",
                booking.guests_count
            ))
        })?;

        let inserted = sqlx::query(
            r"
            INSERT INTO bookings
                (user_id, hotel_id, room_id, check_in_date, check_out_date, guests_count, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(booking.user_id.get())
        .bind(booking.hotel_id.get())
        .bind(booking.room_id.get())
        .bind(booking.stay.check_in())
        .bind(booking.stay.check_out())
        .bind(guests)
        .bind(booking.total_price)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(BookingId::new(row.get("id"))),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(EXCLUSION_VIOLATION) => {
                tracing::debug!(
                    room_id = %booking.room_id,
                    stay = %booking.stay,
                    "Insert rejected by overlap constraint"
                );
                Err(RepositoryError::Conflict {
                    room_id: booking.room_id,
                    stay: booking.stay,
                })
            }
            Err(e) => Err(storage_error(&e)),
        }
    }

    async fn occupied(&self, stay: &Stay) -> Result<OccupancySet, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT DISTINCT room_id
            FROM bookings
            WHERE NOT (check_out_date <= $1 OR check_in_date >= $2)
            ",
        )
        .bind(stay.check_in())
        .bind(stay.check_out())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        Ok(rows
            .iter()
            .map(|row| RoomId::new(row.get("room_id")))
            .collect())
    }

    async fn bookings_where(&self, column: &str, id: i64) -> Result<Vec<Booking>, RepositoryError> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {column} = $1 ORDER BY check_in_date DESC, id DESC"
        );
        let rows = sqlx::query(&query)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error(&e))?;

        rows.iter().map(row_to_booking).collect()
    }

    async fn user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, full_name FROM users WHERE id = $1")
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error(&e))?;

        Ok(row.map(|row| User {
            id: UserId::new(row.get("id")),
            email: row.get("email"),
            full_name: row.get("full_name"),
        }))
    }

    /// Insert a user and return their id. Used to seed fixtures and by
    /// operator tooling; bookings only read users.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the insert fails, including a duplicate email.
    pub async fn create_user(&self, email: &str, full_name: &str) -> Result<UserId, RepositoryError> {
        let row = sqlx::query("INSERT INTO users (email, full_name) VALUES ($1, $2) RETURNING id")
            .bind(email)
            .bind(full_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error(&e))?;
        Ok(UserId::new(row.get("id")))
    }
}

fn row_to_booking(row: &PgRow) -> Result<Booking, RepositoryError> {
    let guests: i32 = row.get("guests_count");
    let check_in: NaiveDate = row.get("check_in_date");
    let check_out: NaiveDate = row.get("check_out_date");

    Ok(Booking {
        id: BookingId::new(row.get("id")),
        user_id: UserId::new(row.get("user_id")),
        hotel_id: HotelId::new(row.get("hotel_id")),
        room_id: RoomId::new(row.get("room_id")),
        check_in,
        check_out,
        guests_count: u32::try_from(guests).map_err(|_| {
            RepositoryError::Unavailable(format!("stored guests_count {guests} is negative"))
        })?,
        total_price: row.get("total_price"),
    })
}

impl BookingRepository for PostgresBookingRepository {
    fn create_booking(
        &self,
        booking: &NewBooking,
    ) -> Pin<Box<dyn Future<Output = Result<BookingId, RepositoryError>> + Send + '_>> {
        let booking = booking.clone();
        Box::pin(async move { self.insert(&booking).await })
    }

    fn occupied_rooms(
        &self,
        stay: &Stay,
    ) -> Pin<Box<dyn Future<Output = Result<OccupancySet, RepositoryError>> + Send + '_>> {
        let stay = *stay;
        Box::pin(async move { self.occupied(&stay).await })
    }

    fn user_bookings(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.bookings_where("user_id", user_id.get()).await })
    }

    fn hotel_bookings(
        &self,
        hotel_id: HotelId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.bookings_where("hotel_id", hotel_id.get()).await })
    }

    fn find_user(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<User>, RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.user(user_id).await })
    }
}

//! `PostgreSQL` storage for the hotel booking system.
//!
//! - [`PostgresBookingRepository`]: implements `BookingRepository` with sqlx.
//!   An exclusion constraint on `(room_id, daterange(check_in, check_out))`
//!   makes the database the final arbiter of room allocation; a violation
//!   surfaces as `RepositoryError::Conflict`.
//! - [`PostgresDeadLetterQueue`]: implements `DeadLetterSink`, with listing and
//!   resolution for operators.
//! - [`migrations::run`]: idempotent schema setup.
//!
//! # Example
//!
//! ```ignore
//! use hotel_booking_postgres::{PostgresBookingRepository, migrations};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let repository = PostgresBookingRepository::connect("postgres://localhost/hotel", 10).await?;
//!     migrations::run(repository.pool()).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dead_letter_queue;
pub mod migrations;
pub mod repository;

pub use dead_letter_queue::{DeadLetterStatus, FailedNotification, PostgresDeadLetterQueue};
pub use repository::PostgresBookingRepository;

use hotel_booking_core::repository::RepositoryError;

/// `SQLSTATE` for `exclusion_violation`.
pub(crate) const EXCLUSION_VIOLATION: &str = "23P01";

/// Map a driver error onto the repository taxonomy.
pub(crate) fn storage_error(error: &sqlx::Error) -> RepositoryError {
    match error {
        sqlx::Error::PoolTimedOut => RepositoryError::Timeout,
        sqlx::Error::RowNotFound => RepositoryError::NotFound(error.to_string()),
        _ => RepositoryError::Unavailable(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_a_timeout() {
        assert_eq!(storage_error(&sqlx::Error::PoolTimedOut), RepositoryError::Timeout);
    }

    #[test]
    fn closed_pool_is_unavailable() {
        assert!(matches!(
            storage_error(&sqlx::Error::PoolClosed),
            RepositoryError::Unavailable(_)
        ));
    }

    #[test]
    fn missing_row_is_not_found() {
        assert!(matches!(
            storage_error(&sqlx::Error::RowNotFound),
            RepositoryError::NotFound(_)
        ));
    }
}

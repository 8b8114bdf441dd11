//! Schema setup.
//!
//! Every statement is idempotent, so [`run`] is safe to call on each start.

use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS btree_gist",
    r"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        full_name TEXT NOT NULL,
        phone TEXT
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS bookings (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL,
        hotel_id BIGINT NOT NULL,
        room_id BIGINT NOT NULL,
        check_in_date DATE NOT NULL,
        check_out_date DATE NOT NULL,
        guests_count INTEGER NOT NULL CHECK (guests_count > 0),
        total_price DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (check_out_date > check_in_date),
        CONSTRAINT bookings_no_overlap EXCLUDE USING gist (
            room_id WITH =,
            daterange(check_in_date, check_out_date) WITH &&
        )
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id, check_in_date DESC)",
    "CREATE INDEX IF NOT EXISTS idx_bookings_hotel ON bookings(hotel_id, check_in_date DESC)",
    r"
    CREATE TABLE IF NOT EXISTS failed_notifications (
        id BIGSERIAL PRIMARY KEY,
        topic TEXT NOT NULL,
        partition INTEGER NOT NULL,
        message_offset BIGINT NOT NULL,
        payload BYTEA NOT NULL,
        stage TEXT NOT NULL,
        error_message TEXT NOT NULL,
        failed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        status TEXT NOT NULL DEFAULT 'pending',
        resolved_at TIMESTAMPTZ,
        resolved_by TEXT,
        resolution_notes TEXT
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_failed_notifications_status ON failed_notifications(status, failed_at)",
];

/// Create the extension, tables and indexes if they do not exist.
///
/// # Errors
///
/// Returns the driver error of the first statement that fails.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    tracing::info!(statements = STATEMENTS.len(), "Database schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_before_the_constraint_that_needs_it() {
        let extension = STATEMENTS
            .iter()
            .position(|s| s.contains("btree_gist"))
            .unwrap_or(usize::MAX);
        let bookings = STATEMENTS
            .iter()
            .position(|s| s.contains("TABLE IF NOT EXISTS bookings"))
            .unwrap_or(0);
        assert!(extension < bookings);
    }

    #[test]
    fn statements_are_idempotent() {
        for statement in STATEMENTS {
            assert!(statement.contains("IF NOT EXISTS"), "{statement}");
        }
    }
}

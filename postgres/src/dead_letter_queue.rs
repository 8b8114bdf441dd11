//! Dead-letter queue for notifications the consumer gave up on.
//!
//! Keeps the raw payload and failure metadata so an operator can inspect a
//! message, fix the cause and mark it resolved, or discard it.

use crate::storage_error;
use chrono::{DateTime, Utc};
use hotel_booking_core::dead_letter::{DeadLetter, DeadLetterSink, FailureStage};
use hotel_booking_core::repository::RepositoryError;
use sqlx::{PgPool, Row};
use std::future::Future;
use std::pin::Pin;

/// Status of a failed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterStatus {
    /// Waiting for an operator
    Pending,
    /// Fixed and re-sent
    Resolved,
    /// Given up on for good
    Discarded,
}

impl DeadLetterStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Discarded => "discarded",
        }
    }

    /// Parse the database representation.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Unavailable`] for an unknown status.
    pub fn parse(s: &str) -> Result<Self, RepositoryError> {
        match s {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            "discarded" => Ok(Self::Discarded),
            _ => Err(RepositoryError::Unavailable(format!(
                "Invalid dead-letter status: {s}"
            ))),
        }
    }
}

fn parse_stage(s: &str) -> Result<FailureStage, RepositoryError> {
    match s {
        "decode" => Ok(FailureStage::Decode),
        "dispatch" => Ok(FailureStage::Dispatch),
        _ => Err(RepositoryError::Unavailable(format!(
            "Invalid failure stage: {s}"
        ))),
    }
}

/// A stored dead letter.
#[derive(Debug, Clone)]
pub struct FailedNotification {
    /// Row identifier
    pub id: i64,
    /// The message and why it failed
    pub letter: DeadLetter,
    /// When it was recorded
    pub failed_at: DateTime<Utc>,
    /// Current status
    pub status: DeadLetterStatus,
    /// When it was resolved or discarded
    pub resolved_at: Option<DateTime<Utc>>,
    /// Who resolved it
    pub resolved_by: Option<String>,
    /// Operator notes
    pub resolution_notes: Option<String>,
}

/// `PostgreSQL`-backed [`DeadLetterSink`].
///
/// # Example
///
/// ```no_run
/// use hotel_booking_postgres::PostgresDeadLetterQueue;
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let dlq = PostgresDeadLetterQueue::new(pool);
///
/// for failed in dlq.list_pending(100).await? {
///     println!("{} at offset {}: {}", failed.letter.topic, failed.letter.offset, failed.letter.reason);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresDeadLetterQueue {
    pool: PgPool,
}

impl PostgresDeadLetterQueue {
    /// Create a queue over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a dead letter and return its id.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the insert fails.
    pub async fn add(&self, letter: &DeadLetter) -> Result<i64, RepositoryError> {
        let (id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO failed_notifications
                (topic, partition, message_offset, payload, stage, error_message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(&letter.topic)
        .bind(letter.partition)
        .bind(letter.offset)
        .bind(&letter.payload)
        .bind(letter.stage.as_str())
        .bind(&letter.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        tracing::warn!(
            dlq_id = id,
            topic = %letter.topic,
            partition = letter.partition,
            offset = letter.offset,
            stage = %letter.stage,
            error = %letter.reason,
            "Notification added to dead-letter queue"
        );

        Ok(id)
    }

    /// Pending letters, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the query fails.
    pub async fn list_pending(&self, limit: usize) -> Result<Vec<FailedNotification>, RepositoryError> {
        self.list_by_status(DeadLetterStatus::Pending, limit).await
    }

    /// Letters with `status`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the query fails.
    pub async fn list_by_status(
        &self,
        status: DeadLetterStatus,
        limit: usize,
    ) -> Result<Vec<FailedNotification>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"
            SELECT
                id, topic, partition, message_offset, payload, stage, error_message,
                failed_at, status, resolved_at, resolved_by, resolution_notes
            FROM failed_notifications
            WHERE status = $1
            ORDER BY failed_at ASC, id ASC
            LIMIT $2
            ",
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        rows.iter().map(Self::row_to_failed).collect()
    }

    /// Mark a letter resolved by `resolved_by`.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the update fails or no such letter exists.
    pub async fn mark_resolved(
        &self,
        id: i64,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE failed_notifications
            SET status = 'resolved',
                resolved_at = NOW(),
                resolved_by = $1,
                resolution_notes = $2
            WHERE id = $3
            ",
        )
        .bind(resolved_by)
        .bind(notes)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("dead letter {id}")));
        }
        tracing::info!(dlq_id = id, resolved_by, "Dead letter resolved");
        Ok(())
    }

    /// Mark a letter discarded.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the update fails or no such letter exists.
    pub async fn mark_discarded(&self, id: i64, reason: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE failed_notifications
            SET status = 'discarded',
                resolved_at = NOW(),
                resolution_notes = $1
            WHERE id = $2
            ",
        )
        .bind(reason)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("dead letter {id}")));
        }
        tracing::warn!(dlq_id = id, reason, "Dead letter discarded");
        Ok(())
    }

    /// Number of pending letters.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the query fails.
    pub async fn count_pending(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM failed_notifications WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage_error(&e))?;

        #[allow(clippy::cast_precision_loss)] // Gauge only needs an approximate count
        let pending = count as f64;
        metrics::gauge!("notifications_dead_letters_pending").set(pending);
        Ok(count)
    }

    fn row_to_failed(row: &sqlx::postgres::PgRow) -> Result<FailedNotification, RepositoryError> {
        let stage: String = row.get("stage");
        let status: String = row.get("status");

        Ok(FailedNotification {
            id: row.get("id"),
            letter: DeadLetter {
                topic: row.get("topic"),
                partition: row.get("partition"),
                offset: row.get("message_offset"),
                payload: row.get("payload"),
                stage: parse_stage(&stage)?,
                reason: row.get("error_message"),
            },
            failed_at: row.get("failed_at"),
            status: DeadLetterStatus::parse(&status)?,
            resolved_at: row.get("resolved_at"),
            resolved_by: row.get("resolved_by"),
            resolution_notes: row.get("resolution_notes"),
        })
    }
}

impl DeadLetterSink for PostgresDeadLetterQueue {
    fn record(
        &self,
        letter: DeadLetter,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.add(&letter).await.map(|_| ()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in &[
            DeadLetterStatus::Pending,
            DeadLetterStatus::Resolved,
            DeadLetterStatus::Discarded,
        ] {
            let parsed = DeadLetterStatus::parse(status.as_str()).expect("valid status should parse");
            assert_eq!(*status, parsed);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(DeadLetterStatus::parse("processing").is_err());
    }

    #[test]
    fn stage_names_match_the_core_enum() {
        assert_eq!(parse_stage(FailureStage::Decode.as_str()).unwrap(), FailureStage::Decode);
        assert_eq!(parse_stage(FailureStage::Dispatch.as_str()).unwrap(), FailureStage::Dispatch);
        assert!(parse_stage("render").is_err());
    }
}

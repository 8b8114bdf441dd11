//! Parking lot for messages that could not be handled.
//!
//! Dead-lettering is opt-in. Without a sink the consumer logs the failure and
//! moves on, which loses the message.

use crate::repository::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Where in the consumer a message failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The payload was not a valid event
    Decode,
    /// Rendering or sending the notification failed
    Dispatch,
}

impl FailureStage {
    /// Stable lowercase name, used as a storage value and metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message the consumer gave up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    /// Topic the message came from
    pub topic: String,
    /// Partition the message came from
    pub partition: i32,
    /// Offset within the partition
    pub offset: i64,
    /// Raw payload, as received
    pub payload: Vec<u8>,
    /// Failing stage
    pub stage: FailureStage,
    /// Error text
    pub reason: String,
}

/// Destination for dead letters.
pub trait DeadLetterSink: Send + Sync {
    /// Record a dead letter.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the record could not be stored.
    fn record(
        &self,
        letter: DeadLetter,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>>;
}

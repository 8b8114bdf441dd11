//! Partitioned publish/subscribe with consumer groups.
//!
//! Booking events travel through a single topic. Publishers hand opaque payloads
//! to [`EventBus::publish`]; the broker picks the partition. Consumers join a
//! named group through [`ConsumerGroup::join`] and receive a [`GroupMember`]
//! handle. The broker assigns each partition to exactly one member of a group
//! at a time and rebalances when members join or leave.
//!
//! # Delivery
//!
//! ```text
//! publish ──► topic ──► partition 0 ──► member 0
//!                   ├─► partition 1 ──► member 1
//!                   └─► partition 2 ──► member 2
//! ```
//!
//! - **At-least-once**: a message whose offset was not committed before a
//!   rebalance or restart is delivered again
//! - **Ordered within partition**: offsets only move forward
//! - **Manual commit**: members commit after handling, never before
//!
//! # Dyn Compatibility
//!
//! Async methods return `Pin<Box<dyn Future>>` so implementations can be shared
//! as `Arc<dyn EventBus>` and `Arc<dyn ConsumerGroup>`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to connect to the event bus
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish a payload to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to join a consumer group or subscribe to its topic
    #[error("Subscription failed for topic '{topic}': {reason}")]
    SubscriptionFailed {
        /// The topic that failed to subscribe
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to commit a consumed offset
    #[error("Commit failed for {topic}[{partition}]@{offset}: {reason}")]
    CommitFailed {
        /// Topic of the delivery
        topic: String,
        /// Partition of the delivery
        partition: i32,
        /// Offset of the delivery
        offset: i64,
        /// The reason for failure
        reason: String,
    },

    /// Network or transport error
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// A single message handed to a group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Topic the message was read from
    pub topic: String,
    /// Partition the message was read from
    pub partition: i32,
    /// Offset of the message within its partition
    pub offset: i64,
    /// Raw payload
    pub payload: Vec<u8>,
}

/// Publishing side of the broker.
pub trait EventBus: Send + Sync {
    /// Hand a payload to the broker for `topic`.
    ///
    /// Returns once the broker client has acknowledged the payload locally.
    /// Partition placement is left to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the broker rejects the payload
    /// or cannot be reached.
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;
}

/// Consuming side of the broker.
pub trait ConsumerGroup: Send + Sync {
    /// Join `group_id` on `topic` as member number `member`.
    ///
    /// The returned handle starts reading each assigned partition from the
    /// group's last committed offset.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if the member cannot join.
    fn join(
        &self,
        group_id: &str,
        topic: &str,
        member: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn GroupMember>, EventBusError>> + Send + '_>>;
}

/// One member's handle into a consumer group.
pub trait GroupMember: Send {
    /// Wait up to `timeout` for the next delivery on an assigned partition.
    ///
    /// `Ok(None)` means the wait timed out with nothing to read.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::TransportError`] if the broker connection fails.
    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Delivery>, EventBusError>> + Send + '_>>;

    /// Commit `delivery`, advancing the group's read position past it.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::CommitFailed`] if the broker rejects the commit.
    fn commit(&mut self, delivery: &Delivery) -> Result<(), EventBusError>;

    /// Leave the group, releasing assigned partitions to the remaining members.
    fn leave(&mut self);
}

//! Redpanda event bus for the hotel booking system.
//!
//! Implements the core `EventBus` (producer side) and `ConsumerGroup`
//! (consumer side) traits with rdkafka, so it works against Redpanda or any
//! Kafka-compatible broker.
//!
//! # Delivery semantics
//!
//! - Publishing is keyless: the broker spreads booking events across partitions.
//! - One producer is created per [`RedpandaEventBus`] and shared for the life of
//!   the process.
//! - Each [`RedpandaGroupMember`] owns its own consumer in the configured group,
//!   with auto-commit disabled. The runtime commits after handling each message,
//!   which gives at-least-once delivery.
//!
//! # Example
//!
//! ```no_run
//! use hotel_booking_redpanda::RedpandaEventBus;
//! use hotel_booking_core::event_bus::EventBus;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = RedpandaEventBus::builder()
//!     .brokers("localhost:9091,localhost:9092,localhost:9093")
//!     .producer_acks("1")
//!     .build()?;
//!
//! bus.publish("booking-created", br#"{"booking_id":1}"#).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use hotel_booking_core::event_bus::{
    ConsumerGroup, Delivery, EventBus, EventBusError, GroupMember,
};
use rdkafka::Offset;
use rdkafka::TopicPartitionList;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Kafka-compatible event bus.
///
/// # Example
///
/// ```no_run
/// use hotel_booking_redpanda::RedpandaEventBus;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = RedpandaEventBus::builder()
///     .brokers("localhost:9092")
///     .producer_acks("all")
///     .compression("lz4")
///     .timeout(Duration::from_secs(10))
///     .auto_offset_reset("earliest")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RedpandaEventBus {
    producer: FutureProducer,
    brokers: String,
    timeout: Duration,
    auto_offset_reset: String,
    session_timeout: Duration,
}

impl RedpandaEventBus {
    /// Create a bus with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if the producer cannot be created.
    pub fn new(brokers: &str) -> Result<Self, EventBusError> {
        Self::builder().brokers(brokers).build()
    }

    /// Start configuring a bus.
    #[must_use]
    pub fn builder() -> RedpandaEventBusBuilder {
        RedpandaEventBusBuilder::default()
    }

    /// Bootstrap servers.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    fn consumer_config(&self, group_id: &str, member: usize) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group_id)
            .set("client.id", format!("{group_id}-{member}"))
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("session.timeout.ms", self.session_timeout.as_millis().to_string())
            .set("enable.partition.eof", "false");
        config
    }
}

/// Builder for [`RedpandaEventBus`].
#[derive(Default)]
pub struct RedpandaEventBusBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
    auto_offset_reset: Option<String>,
    session_timeout: Option<Duration>,
}

impl RedpandaEventBusBuilder {
    /// Comma-separated bootstrap servers.
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Producer acknowledgment mode: `"0"`, `"1"` or `"all"`.
    ///
    /// Default: `"1"`
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Compression codec: `"none"`, `"gzip"`, `"snappy"`, `"lz4"` or `"zstd"`.
    ///
    /// Default: `"none"`
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Bound on a single publish.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Where a group with no committed offset starts reading: `"earliest"` or `"latest"`.
    ///
    /// Default: `"latest"`
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// How long the broker waits before declaring a silent member dead.
    ///
    /// Default: 6 seconds
    #[must_use]
    pub const fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Create the producer.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if brokers are missing or the
    /// producer configuration is rejected.
    pub fn build(self) -> Result<RedpandaEventBus, EventBusError> {
        let brokers = self
            .brokers
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| EventBusError::ConnectionFailed("Brokers not configured".to_string()))?;
        let timeout = self.timeout.unwrap_or(Duration::from_secs(5));
        let acks = self.producer_acks.as_deref().unwrap_or("1");
        let compression = self.compression.as_deref().unwrap_or("none");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", acks)
            .set("compression.type", compression)
            .create()
            .map_err(|e| {
                EventBusError::ConnectionFailed(format!("Failed to create producer: {e}"))
            })?;

        let auto_offset_reset = self
            .auto_offset_reset
            .unwrap_or_else(|| "latest".to_string());

        tracing::info!(
            brokers = %brokers,
            acks,
            compression,
            auto_offset_reset = %auto_offset_reset,
            "RedpandaEventBus created"
        );

        Ok(RedpandaEventBus {
            producer,
            brokers,
            timeout,
            auto_offset_reset,
            session_timeout: self.session_timeout.unwrap_or(Duration::from_secs(6)),
        })
    }
}

impl EventBus for RedpandaEventBus {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let payload = payload.to_vec();
        let timeout = self.timeout;

        Box::pin(async move {
            let record: FutureRecord<'_, (), Vec<u8>> = FutureRecord::to(&topic).payload(&payload);

            match self.producer.send(record, Timeout::After(timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(topic = %topic, partition, offset, "Event published");
                    Ok(())
                }
                Err((kafka_error, _)) => {
                    tracing::error!(topic = %topic, error = %kafka_error, "Failed to publish event");
                    Err(EventBusError::PublishFailed {
                        topic,
                        reason: kafka_error.to_string(),
                    })
                }
            }
        })
    }
}

impl ConsumerGroup for RedpandaEventBus {
    fn join(
        &self,
        group_id: &str,
        topic: &str,
        member: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn GroupMember>, EventBusError>> + Send + '_>>
    {
        let config = self.consumer_config(group_id, member);
        let group_id = group_id.to_string();
        let topic = topic.to_string();

        Box::pin(async move {
            let consumer: StreamConsumer =
                config.create().map_err(|e| EventBusError::SubscriptionFailed {
                    topic: topic.clone(),
                    reason: format!("Failed to create consumer: {e}"),
                })?;

            consumer
                .subscribe(&[topic.as_str()])
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topic: topic.clone(),
                    reason: format!("Failed to subscribe: {e}"),
                })?;

            tracing::info!(
                group_id = %group_id,
                topic = %topic,
                member,
                manual_commit = true,
                "Joined consumer group"
            );

            Ok(Box::new(RedpandaGroupMember {
                consumer,
                topic,
                subscribed: true,
            }) as Box<dyn GroupMember>)
        })
    }
}

/// One consumer in a group; partitions are assigned by the broker.
pub struct RedpandaGroupMember {
    consumer: StreamConsumer,
    topic: String,
    subscribed: bool,
}

impl RedpandaGroupMember {
    /// Topic this member consumes.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

fn to_delivery(message: &BorrowedMessage<'_>) -> Delivery {
    Delivery {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        // A tombstone has no payload; it fails to decode and is committed like any bad message.
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

/// Offsets to commit after `delivery`: the next position to read.
fn commit_list(delivery: &Delivery) -> Result<TopicPartitionList, KafkaError> {
    let mut list = TopicPartitionList::new();
    list.add_partition_offset(
        &delivery.topic,
        delivery.partition,
        Offset::Offset(delivery.offset + 1),
    )?;
    Ok(list)
}

impl GroupMember for RedpandaGroupMember {
    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Delivery>, EventBusError>> + Send + '_>> {
        Box::pin(async move {
            if !self.subscribed {
                return Err(EventBusError::TransportError(
                    "member has left the group".to_string(),
                ));
            }
            match tokio::time::timeout(timeout, self.consumer.recv()).await {
                Err(_) => Ok(None),
                Ok(Ok(message)) => {
                    let delivery = to_delivery(&message);
                    tracing::trace!(
                        topic = %delivery.topic,
                        partition = delivery.partition,
                        offset = delivery.offset,
                        "Received message"
                    );
                    Ok(Some(delivery))
                }
                Ok(Err(e)) => Err(EventBusError::TransportError(format!(
                    "Failed to receive message: {e}"
                ))),
            }
        })
    }

    fn commit(&mut self, delivery: &Delivery) -> Result<(), EventBusError> {
        let to_commit_failure = |e: KafkaError| EventBusError::CommitFailed {
            topic: delivery.topic.clone(),
            partition: delivery.partition,
            offset: delivery.offset,
            reason: e.to_string(),
        };
        let list = commit_list(delivery).map_err(to_commit_failure)?;
        self.consumer
            .commit(&list, CommitMode::Async)
            .map_err(to_commit_failure)
    }

    fn leave(&mut self) {
        if self.subscribed {
            self.consumer.unsubscribe();
            self.subscribed = false;
            tracing::info!(topic = %self.topic, "Left consumer group");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn redpanda_event_bus_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaEventBus>();
        assert_sync::<RedpandaEventBus>();
        assert_send::<RedpandaGroupMember>();
    }

    #[test]
    fn build_without_brokers_fails() {
        let result = RedpandaEventBus::builder().build();
        assert!(matches!(result, Err(EventBusError::ConnectionFailed(_))));

        let blank = RedpandaEventBus::builder().brokers("  ").build();
        assert!(matches!(blank, Err(EventBusError::ConnectionFailed(_))));
    }

    #[test]
    fn build_does_not_need_a_reachable_broker() {
        let bus = RedpandaEventBus::builder()
            .brokers("localhost:9091,localhost:9092,localhost:9093")
            .producer_acks("all")
            .build()
            .unwrap();
        assert_eq!(bus.brokers(), "localhost:9091,localhost:9092,localhost:9093");
    }

    #[test]
    fn consumer_config_disables_auto_commit() {
        let bus = RedpandaEventBus::builder()
            .brokers("localhost:9092")
            .auto_offset_reset("earliest")
            .build()
            .unwrap();
        let config = bus.consumer_config("notification-service-group", 2);

        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("group.id"), Some("notification-service-group"));
        assert_eq!(config.get("client.id"), Some("notification-service-group-2"));
        assert_eq!(config.get("auto.offset.reset"), Some("earliest"));
    }

    #[test]
    fn commit_points_past_the_handled_message() {
        let delivery = Delivery {
            topic: "booking-created".to_string(),
            partition: 1,
            offset: 41,
            payload: Vec::new(),
        };
        let list = commit_list(&delivery).unwrap();
        let element = list.find_partition("booking-created", 1).unwrap();
        assert_eq!(element.offset(), Offset::Offset(42));
    }
}

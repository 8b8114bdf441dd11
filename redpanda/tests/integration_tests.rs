//! Integration tests for [`RedpandaEventBus`] against a real Kafka broker.
//!
//! These tests are `#[ignore]` by default because they need Docker and take
//! tens of seconds to start the broker:
//!
//! ```bash
//! cargo test -p hotel-booking-redpanda --test integration_tests -- --ignored
//! ```

#![allow(clippy::expect_used, clippy::unwrap_used)]
#![allow(clippy::panic)]

use hotel_booking_core::BookingId;
use hotel_booking_core::event::BookingCreatedEvent;
use hotel_booking_core::event_bus::{ConsumerGroup, EventBus};
use hotel_booking_redpanda::RedpandaEventBus;
use hotel_booking_runtime::{
    ConsumerGroupRuntime, ConsumerSettings, EventPublisher, NotificationDispatcher,
};
use hotel_booking_testing::{RecordingRenderer, RecordingTransport, date};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::kafka::{KAFKA_PORT, Kafka};

async fn start_kafka() -> (ContainerAsync<Kafka>, String) {
    let kafka = Kafka::default()
        .with_env_var("KAFKA_AUTO_CREATE_TOPICS_ENABLE", "true")
        .start()
        .await
        .expect("Failed to start Kafka container");

    let host = kafka.get_host().await.expect("Failed to get host");
    let port = kafka
        .get_host_port_ipv4(KAFKA_PORT)
        .await
        .expect("Failed to get port");
    (kafka, format!("{host}:{port}"))
}

fn bus(brokers: &str) -> RedpandaEventBus {
    RedpandaEventBus::builder()
        .brokers(brokers)
        .auto_offset_reset("earliest")
        .build()
        .expect("Failed to create event bus")
}

/// Publish until the broker accepts, which also auto-creates the topic.
async fn wait_for_topic(bus: &RedpandaEventBus, topic: &str) {
    for attempt in 1..=60 {
        if bus.publish(topic, b"warmup").await.is_ok() {
            tokio::time::sleep(Duration::from_secs(2)).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(attempt != 60, "Topic {topic} never became writable");
    }
}

fn event(booking_id: i64) -> BookingCreatedEvent {
    BookingCreatedEvent {
        booking_id: BookingId::new(booking_id),
        user_email: format!("guest{booking_id}@example.com"),
        user_name: "Test Guest".to_string(),
        amount: 300.0,
        check_in: date(2024, 1, 1),
        check_out: date(2024, 1, 4),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn published_payload_reaches_a_group_member() {
    let (_kafka, brokers) = start_kafka().await;
    let bus = bus(&brokers);
    wait_for_topic(&bus, "roundtrip").await;

    let mut member = bus.join("roundtrip-group", "roundtrip", 0).await.unwrap();
    bus.publish("roundtrip", b"hello").await.unwrap();

    let mut payloads = HashSet::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    while !payloads.contains(b"hello".as_slice()) {
        assert!(tokio::time::Instant::now() < deadline, "message never arrived");
        if let Some(delivery) = member.poll(Duration::from_secs(1)).await.unwrap() {
            member.commit(&delivery).unwrap();
            payloads.insert(delivery.payload);
        }
    }
    member.leave();
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn committed_messages_are_not_redelivered_to_the_next_member() {
    let (_kafka, brokers) = start_kafka().await;
    let bus = bus(&brokers);
    wait_for_topic(&bus, "commits").await;
    bus.publish("commits", b"first").await.unwrap();

    let mut first = bus.join("commit-group", "commits", 0).await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        assert!(tokio::time::Instant::now() < deadline, "first member got nothing");
        if let Some(delivery) = first.poll(Duration::from_secs(1)).await.unwrap() {
            first.commit(&delivery).unwrap();
            if delivery.payload == b"first" {
                break;
            }
        }
    }
    // Async commits are flushed when the consumer closes.
    first.leave();
    drop(first);

    bus.publish("commits", b"second").await.unwrap();
    let mut second = bus.join("commit-group", "commits", 1).await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        assert!(tokio::time::Instant::now() < deadline, "second member got nothing");
        if let Some(delivery) = second.poll(Duration::from_secs(1)).await.unwrap() {
            assert_ne!(delivery.payload, b"first", "committed message was redelivered");
            if delivery.payload == b"second" {
                break;
            }
        }
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn notification_workers_send_confirmations_from_kafka() {
    let (_kafka, brokers) = start_kafka().await;
    let bus = Arc::new(bus(&brokers));
    wait_for_topic(&bus, "booking-created").await;

    let transport = RecordingTransport::new();
    let dispatcher = NotificationDispatcher::new(
        Arc::new(RecordingRenderer::new()),
        Arc::new(transport.clone()),
    );
    let running = ConsumerGroupRuntime::new(
        bus.clone(),
        Arc::new(dispatcher),
        ConsumerSettings {
            workers: 2,
            shutdown_grace: Duration::from_secs(10),
            ..ConsumerSettings::default()
        },
    )
    .start();

    let publisher = EventPublisher::new(bus.clone());
    for booking_id in 1..=3 {
        publisher.publish(&event(booking_id), "booking-created").await.unwrap();
    }

    assert!(transport.wait_for_attempts(3, Duration::from_secs(60)).await);
    running.shutdown().await;

    let recipients: HashSet<String> = transport.sent().into_iter().flat_map(|m| m.to).collect();
    for booking_id in 1..=3 {
        assert!(recipients.contains(&format!("guest{booking_id}@example.com")));
    }
}

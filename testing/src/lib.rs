//! # Hotel Booking Testing
//!
//! In-memory collaborators for fast, deterministic tests of the booking
//! pipeline:
//!
//! - [`InMemoryInventory`]: prices and room lists, with failure and latency injection
//! - [`InMemoryBookingRepository`]: bookings and users, rejecting overlapping stays
//! - [`InMemoryBroker`]: partitioned topics and consumer groups with commits
//! - [`RecordingRenderer`], [`RecordingTransport`], [`RecordingDeadLetters`]:
//!   notification side effects captured for assertions
//! - [`fixtures`]: dates, requests and test logging
//!
//! ## Example
//!
//! ```ignore
//! let inventory = InMemoryInventory::new()
//!     .with_price(1, 2, 100.0)
//!     .with_rooms(1, 2, &[101, 102]);
//! let repository = InMemoryBookingRepository::new();
//! let broker = InMemoryBroker::new(3);
//!
//! let orchestrator = BookingOrchestrator::new(
//!     Arc::new(inventory),
//!     Arc::new(repository),
//!     EventPublisher::new(Arc::new(broker.clone())),
//!     OrchestratorConfig::default(),
//! );
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

pub mod broker;
pub mod fixtures;
pub mod inventory;
pub mod notification;
pub mod repository;

pub use broker::{InMemoryBroker, InMemoryGroupMember};
pub use fixtures::{booking_request, date};
pub use inventory::InMemoryInventory;
pub use notification::{RecordingDeadLetters, RecordingRenderer, RecordingTransport, SentMail};
pub use repository::InMemoryBookingRepository;

//! # Hotel Booking Core
//!
//! Domain types, error taxonomy and capability traits for the hotel booking system.
//!
//! This crate contains no I/O. Every remote collaborator (inventory service,
//! relational storage, message broker, template renderer, mail transport) is
//! described by a trait here and implemented elsewhere:
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────┐     ┌───────────────────┐
//! │ HTTP request │ ──► │ BookingOrchestrator│ ──► │ InventoryClient   │
//! └──────────────┘     │     (runtime)      │ ──► │ BookingRepository │
//!                      └─────────┬──────────┘     └───────────────────┘
//!                                │ BookingCreatedEvent
//!                                ▼
//!                      ┌────────────────────┐
//!                      │ EventBus (topic)   │
//!                      └─────────┬──────────┘
//!                                │ ConsumerGroup / GroupMember
//!                                ▼
//!                      ┌────────────────────┐     ┌───────────────────┐
//!                      │ ConsumerGroup      │ ──► │ Renderer          │
//!                      │ Runtime (workers)  │ ──► │ MailTransport     │
//!                      └────────────────────┘     └───────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`booking`]: identifiers, requests, persisted bookings, stays and prices
//! - [`error`]: the booking error taxonomy with machine-readable codes
//! - [`event`]: the `BookingCreatedEvent` wire payload
//! - [`event_bus`]: partitioned publish/subscribe with consumer groups
//! - [`inventory`]: the remote inventory service
//! - [`repository`]: durable storage for bookings and users
//! - [`notification`]: template rendering and mail transport
//! - [`dead_letter`]: optional parking lot for messages that could not be handled

pub mod booking;
pub mod dead_letter;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod inventory;
pub mod notification;
pub mod repository;

// Re-export commonly used types
pub use booking::{
    Booking, BookingId, BookingRequest, HotelId, NewBooking, OccupancySet, PriceQuote,
    RoomCandidates, RoomId, RoomTypeId, Stay, User, UserId,
};
pub use chrono::NaiveDate;
pub use error::BookingError;
pub use event::BookingCreatedEvent;

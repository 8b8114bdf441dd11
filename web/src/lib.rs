//! HTTP boundary for the hotel booking system.
//!
//! A thin axum layer over `BookingOrchestrator`: handlers parse requests,
//! call the orchestrator and map [`hotel_booking_core::BookingError`] onto
//! status codes through [`AppError`]. Every request carries a correlation ID.
//!
//! # Routes
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/api/bookings` | [`handlers::bookings::create_booking`] |
//! | GET | `/api/users/{id}/bookings` | [`handlers::bookings::user_bookings`] |
//! | GET | `/api/hotels/{id}/bookings` | [`handlers::bookings::hotel_bookings`] |
//! | GET | `/health` | [`handlers::health::health_check`] |
//! | GET | `/metrics` | [`handlers::health::metrics`] |
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::new(Arc::new(orchestrator)).with_metrics(handle);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use error::AppError;
pub use extractors::CorrelationId;
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the router with every route and middleware installed.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/users/:id/bookings", get(handlers::bookings::user_bookings))
        .route("/api/hotels/:id/bookings", get(handlers::bookings::hotel_bookings))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

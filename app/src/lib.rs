//! # Hotel Booking App
//!
//! Infrastructure adapters and process wiring for the two binaries:
//!
//! - `booking-server`: the HTTP booking API backed by `PostgreSQL`, the
//!   inventory service and the broker
//! - `notification-worker`: consumer-group workers that mail booking
//!   confirmations and serve `POST /html_email`
//!
//! ## Modules
//!
//! - [`config`]: environment configuration
//! - [`email_api`]: `POST /html_email` for ad-hoc templated mail
//! - [`inventory_client`]: `InventoryClient` over HTTP (reqwest)
//! - [`mail`]: `MailTransport` over SMTP (lettre)
//! - [`templates`]: the built-in confirmation template and `Renderer`
//! - [`lifecycle`]: tracing, shutdown signals and HTTP draining

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod email_api;
pub mod inventory_client;
pub mod lifecycle;
pub mod mail;
pub mod templates;

pub use config::{Config, ConfigError};
pub use email_api::email_router;
pub use inventory_client::HttpInventoryClient;
pub use mail::SmtpMailTransport;
pub use templates::TemplateRenderer;

//! Ad-hoc templated mail over HTTP.
//!
//! ```text
//! POST /html_email   {"to_addr": "a@x.com,b@y.com", "subject": "...",
//!                     "template": "booking_confirmation", "vars": {...}}
//! ```
//!
//! The notification worker mounts this next to its probes so operators can
//! resend a confirmation or try a template against the live relay.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use hotel_booking_core::notification::{MailTransport, Renderer, TemplateVars};
use hotel_booking_web::AppError;
use serde::Deserialize;
use std::sync::Arc;

/// Body of `POST /html_email`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailRequest {
    /// Comma-separated recipient addresses
    pub to_addr: String,
    /// Subject line
    pub subject: String,
    /// Template identifier
    pub template: String,
    /// Template variables
    #[serde(default)]
    pub vars: TemplateVars,
}

impl EmailRequest {
    /// Recipients with surrounding whitespace and empty entries removed.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        self.to_addr
            .split(',')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Clone)]
struct EmailApi {
    renderer: Arc<dyn Renderer>,
    transport: Arc<dyn MailTransport>,
}

/// Router serving `POST /html_email` with the given renderer and transport.
pub fn email_router(renderer: Arc<dyn Renderer>, transport: Arc<dyn MailTransport>) -> Router {
    Router::new()
        .route("/html_email", post(send_html_email))
        .with_state(EmailApi {
            renderer,
            transport,
        })
}

/// Render the requested template and send it.
///
/// - 400 `BAD_REQUEST` for a malformed body or no recipients
/// - 500 `RENDER_FAILED` for an unknown template or missing variable
/// - 502 `SEND_FAILED` when the relay rejects or cannot be reached
async fn send_html_email(
    State(api): State<EmailApi>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<(StatusCode, &'static str), AppError> {
    let Json(request) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let to = request.recipients();
    if to.is_empty() {
        return Err(AppError::bad_request("to_addr has no recipients"));
    }

    let html = api
        .renderer
        .render(&request.template, &request.vars)
        .map_err(|e| {
            AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "RENDER_FAILED", e.to_string())
                .with_source(e.into())
        })?;

    api.transport
        .send(&to, &request.subject, &html)
        .await
        .map_err(|e| {
            AppError::new(StatusCode::BAD_GATEWAY, "SEND_FAILED", "Failed to send email")
                .with_source(e.into())
        })?;

    tracing::info!(template = %request.template, recipients = to.len(), "Templated email sent");
    Ok((StatusCode::OK, "Email sent successfully"))
}

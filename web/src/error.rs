//! Error type for web handlers.
//!
//! [`AppError`] maps booking failures onto HTTP status codes and renders a
//! `{code, message}` JSON body. Server errors are logged with their source;
//! client errors are not.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hotel_booking_core::BookingError;
use serde::Serialize;
use std::fmt;

/// Application error returned by handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Data>, AppError> {
///     let user = find_user(id).await?
///         .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", format!("User {id} not found")))?;
///     Ok(Json(user))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    /// Internal cause, logged but never sent to the client
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create an error.
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attach an internal cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 404 Not Found with a specific code.
    #[must_use]
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Status for each booking failure: domain rejections are 4xx, infrastructure 5xx.
const fn status_for(error: &BookingError) -> StatusCode {
    match error {
        BookingError::InvalidDateRange { .. } => StatusCode::BAD_REQUEST,
        BookingError::PriceNotFound { .. } | BookingError::NoRoomsOfType { .. } => {
            StatusCode::NOT_FOUND
        }
        BookingError::NoAvailability { .. } => StatusCode::CONFLICT,
        BookingError::InventoryUnavailable(_) | BookingError::StorageUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        BookingError::PublishFailed { .. }
        | BookingError::DecodeFailed(_)
        | BookingError::DispatchFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        let status = status_for(&error);
        let app = Self::new(status, error.code(), error.to_string());
        if status.is_server_error() {
            app.with_source(anyhow::Error::new(error))
        } else {
            app
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            let source = self.source.as_ref().map(ToString::to_string);
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                source = source.as_deref(),
                "Request failed"
            );
        } else {
            tracing::debug!(status = %self.status, code = %self.code, "Request rejected");
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

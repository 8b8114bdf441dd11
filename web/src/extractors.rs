//! Custom extractors.

use crate::middleware::{CORRELATION_ID_HEADER, from_header};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::fmt;
use uuid::Uuid;

/// Correlation ID for the current request.
///
/// Set by the correlation middleware; when the middleware is not installed it
/// falls back to the `X-Correlation-ID` header or a new UUID.
///
/// ```ignore
/// async fn handler(correlation_id: CorrelationId) -> String {
///     format!("Request ID: {correlation_id}")
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }
        Ok(Self(from_header(parts.headers.get(CORRELATION_ID_HEADER))))
    }
}

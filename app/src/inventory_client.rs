//! `InventoryClient` over the inventory service's HTTP API.
//!
//! ```text
//! GET {base}/api/hotels/{hotel_id}/room-types/{room_type_id}/price
//!     200 {"price": 120.0, "currency": "USD"}
//! GET {base}/api/hotels/{hotel_id}/room-types/{room_type_id}/rooms
//!     200 {"room_ids": [101, 102]}
//! ```
//!
//! A 404 is the service saying "no such hotel or room type" and maps to
//! [`InventoryError::NotFound`]. Other failures are transport errors, and a
//! request exceeding the client timeout is [`InventoryError::Timeout`].

use hotel_booking_core::booking::{HotelId, PriceQuote, RoomCandidates, RoomId, RoomTypeId};
use hotel_booking_core::inventory::{InventoryClient, InventoryError};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct PriceBody {
    price: f64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RoomsBody {
    room_ids: Vec<i64>,
}

/// HTTP client for the inventory service.
#[derive(Clone)]
pub struct HttpInventoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryClient {
    /// Create a client whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InventoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, hotel_id: HotelId, room_type_id: RoomTypeId, resource: &str) -> String {
        format!(
            "{}/api/hotels/{hotel_id}/room-types/{room_type_id}/{resource}",
            self.base_url
        )
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        hotel_id: HotelId,
        room_type_id: RoomTypeId,
        resource: &str,
    ) -> Result<T, InventoryError> {
        let url = self.url(hotel_id, room_type_id, resource);
        tracing::debug!(%url, "Calling inventory service");

        let response = self.client.get(&url).send().await.map_err(classify)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(InventoryError::NotFound {
                hotel_id,
                room_type_id,
            });
        }

        response
            .error_for_status()
            .map_err(classify)?
            .json::<T>()
            .await
            .map_err(classify)
    }
}

fn classify(error: reqwest::Error) -> InventoryError {
    if error.is_timeout() {
        InventoryError::Timeout
    } else {
        InventoryError::Transport(error.to_string())
    }
}

impl InventoryClient for HttpInventoryClient {
    fn get_price(
        &self,
        hotel_id: HotelId,
        room_type_id: RoomTypeId,
    ) -> Pin<Box<dyn Future<Output = Result<PriceQuote, InventoryError>> + Send + '_>> {
        Box::pin(async move {
            let body: PriceBody = self.fetch(hotel_id, room_type_id, "price").await?;
            Ok(PriceQuote::new(body.price, body.currency))
        })
    }

    fn get_room_candidates(
        &self,
        hotel_id: HotelId,
        room_type_id: RoomTypeId,
    ) -> Pin<Box<dyn Future<Output = Result<RoomCandidates, InventoryError>> + Send + '_>> {
        Box::pin(async move {
            let body: RoomsBody = self.fetch(hotel_id, room_type_id, "rooms").await?;
            Ok(body.room_ids.into_iter().map(RoomId::new).collect())
        })
    }
}

//! In-memory inventory service.

use hotel_booking_core::booking::{HotelId, PriceQuote, RoomCandidates, RoomId, RoomTypeId};
use hotel_booking_core::inventory::{InventoryClient, InventoryError};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    prices: HashMap<(HotelId, RoomTypeId), PriceQuote>,
    rooms: HashMap<(HotelId, RoomTypeId), RoomCandidates>,
    failure: Option<InventoryError>,
    delay: Option<Duration>,
}

/// Inventory backed by maps, with call counters and failure injection.
///
/// Unknown hotel/room-type pairs answer [`InventoryError::NotFound`].
///
/// # Example
///
/// ```
/// use hotel_booking_testing::InMemoryInventory;
///
/// let inventory = InMemoryInventory::new()
///     .with_price(1, 2, 100.0)
///     .with_rooms(1, 2, &[101, 102]);
/// assert_eq!(inventory.total_calls(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryInventory {
    state: Arc<Mutex<State>>,
    price_calls: Arc<AtomicUsize>,
    candidate_calls: Arc<AtomicUsize>,
}

impl InMemoryInventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote `price` USD per night for a hotel room type.
    #[must_use]
    pub fn with_price(self, hotel_id: i64, room_type_id: i64, price: f64) -> Self {
        self.state.lock().unwrap().prices.insert(
            (HotelId::new(hotel_id), RoomTypeId::new(room_type_id)),
            PriceQuote::new(price, "USD"),
        );
        self
    }

    /// List `rooms`, in this order, for a hotel room type.
    #[must_use]
    pub fn with_rooms(self, hotel_id: i64, room_type_id: i64, rooms: &[i64]) -> Self {
        self.state.lock().unwrap().rooms.insert(
            (HotelId::new(hotel_id), RoomTypeId::new(room_type_id)),
            rooms.iter().copied().map(RoomId::new).collect(),
        );
        self
    }

    /// Make every call fail with `error`, or stop failing with `None`.
    pub fn fail_with(&self, error: Option<InventoryError>) {
        self.state.lock().unwrap().failure = error;
    }

    /// Delay every answer, to exercise call timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().delay = delay;
    }

    /// Number of price lookups.
    #[must_use]
    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    /// Number of candidate lookups.
    #[must_use]
    pub fn candidate_calls(&self) -> usize {
        self.candidate_calls.load(Ordering::SeqCst)
    }

    /// Number of calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.price_calls() + self.candidate_calls()
    }

    fn settings(&self) -> (Option<InventoryError>, Option<Duration>) {
        let state = self.state.lock().unwrap();
        (state.failure.clone(), state.delay)
    }
}

impl InventoryClient for InMemoryInventory {
    fn get_price(
        &self,
        hotel_id: HotelId,
        room_type_id: RoomTypeId,
    ) -> Pin<Box<dyn Future<Output = Result<PriceQuote, InventoryError>> + Send + '_>> {
        Box::pin(async move {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            let (failure, delay) = self.settings();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = failure {
                return Err(error);
            }
            self.state
                .lock()
                .unwrap()
                .prices
                .get(&(hotel_id, room_type_id))
                .cloned()
                .ok_or(InventoryError::NotFound {
                    hotel_id,
                    room_type_id,
                })
        })
    }

    fn get_room_candidates(
        &self,
        hotel_id: HotelId,
        room_type_id: RoomTypeId,
    ) -> Pin<Box<dyn Future<Output = Result<RoomCandidates, InventoryError>> + Send + '_>> {
        Box::pin(async move {
            self.candidate_calls.fetch_add(1, Ordering::SeqCst);
            let (failure, delay) = self.settings();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = failure {
                return Err(error);
            }
            self.state
                .lock()
                .unwrap()
                .rooms
                .get(&(hotel_id, room_type_id))
                .cloned()
                .ok_or(InventoryError::NotFound {
                    hotel_id,
                    room_type_id,
                })
        })
    }
}

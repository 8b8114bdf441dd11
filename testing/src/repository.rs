//! In-memory booking storage.

use hotel_booking_core::booking::{
    Booking, BookingId, HotelId, NewBooking, OccupancySet, RoomId, Stay, User, UserId,
};
use hotel_booking_core::repository::{BookingRepository, RepositoryError};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    bookings: Vec<Booking>,
    users: HashMap<UserId, User>,
    next_id: i64,
    fail_reads: bool,
    fail_writes: bool,
    read_delay: Option<Duration>,
    reads: usize,
    writes: usize,
}

/// Booking storage in a `Vec`, enforcing the same no-overlap rule as the
/// database: a second booking for a room whose stay overlaps an existing one
/// is rejected with [`RepositoryError::Conflict`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryBookingRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryBookingRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user.
    #[must_use]
    pub fn with_user(self, id: i64, email: &str, full_name: &str) -> Self {
        let user = User {
            id: UserId::new(id),
            email: email.to_string(),
            full_name: full_name.to_string(),
        };
        self.state.lock().unwrap().users.insert(user.id, user);
        self
    }

    /// Seed an existing booking of `room_id` for `stay`.
    ///
    /// # Panics
    ///
    /// Panics if the seeded booking overlaps one already present.
    #[must_use]
    pub fn with_booking(self, hotel_id: i64, room_id: i64, stay: Stay) -> Self {
        let booking = NewBooking {
            user_id: UserId::new(0),
            hotel_id: HotelId::new(hotel_id),
            room_id: RoomId::new(room_id),
            stay,
            guests_count: 1,
            total_price: 0.0,
        };
        let mut state = self.state.lock().unwrap();
        let inserted = insert(&mut state, &booking);
        assert!(inserted.is_ok(), "seeded bookings must not overlap");
        drop(state);
        self
    }

    /// Fail reads (occupancy, listings, user lookups).
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// Fail writes.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Delay occupancy reads, to widen the read-then-write window or trip timeouts.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().read_delay = delay;
    }

    /// All stored bookings, in insertion order.
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        self.state.lock().unwrap().bookings.clone()
    }

    /// Number of write attempts, including rejected ones.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    /// Number of read calls.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    fn begin_read(&self) -> Result<Option<Duration>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.fail_reads {
            return Err(RepositoryError::Unavailable("injected read failure".into()));
        }
        Ok(state.read_delay)
    }

    fn listing(&self, keep: impl Fn(&Booking) -> bool) -> Result<Vec<Booking>, RepositoryError> {
        self.begin_read()?;
        let mut bookings: Vec<Booking> = self
            .state
            .lock()
            .unwrap()
            .bookings
            .iter()
            .filter(|booking| keep(booking))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.check_in.cmp(&a.check_in));
        Ok(bookings)
    }
}

fn insert(state: &mut State, booking: &NewBooking) -> Result<BookingId, RepositoryError> {
    let conflict = state.bookings.iter().any(|existing| {
        existing.room_id == booking.room_id
            && Stay::new(existing.check_in, existing.check_out)
                .is_ok_and(|stay| stay.overlaps(&booking.stay))
    });
    if conflict {
        return Err(RepositoryError::Conflict {
            room_id: booking.room_id,
            stay: booking.stay,
        });
    }

    state.next_id += 1;
    let id = BookingId::new(state.next_id);
    state.bookings.push(booking.clone().with_id(id));
    Ok(id)
}

impl BookingRepository for InMemoryBookingRepository {
    fn create_booking(
        &self,
        booking: &NewBooking,
    ) -> Pin<Box<dyn Future<Output = Result<BookingId, RepositoryError>> + Send + '_>> {
        let booking = booking.clone();
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.writes += 1;
            if state.fail_writes {
                return Err(RepositoryError::Unavailable("injected write failure".into()));
            }
            insert(&mut state, &booking)
        })
    }

    fn occupied_rooms(
        &self,
        stay: &Stay,
    ) -> Pin<Box<dyn Future<Output = Result<OccupancySet, RepositoryError>> + Send + '_>> {
        let stay = *stay;
        Box::pin(async move {
            if let Some(delay) = self.begin_read()? {
                tokio::time::sleep(delay).await;
            }
            let state = self.state.lock().unwrap();
            Ok(state
                .bookings
                .iter()
                .filter(|booking| {
                    Stay::new(booking.check_in, booking.check_out)
                        .is_ok_and(|existing| existing.overlaps(&stay))
                })
                .map(|booking| booking.room_id)
                .collect())
        })
    }

    fn user_bookings(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.listing(|booking| booking.user_id == user_id) })
    }

    fn hotel_bookings(
        &self,
        hotel_id: HotelId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.listing(|booking| booking.hotel_id == hotel_id) })
    }

    fn find_user(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<User>, RepositoryError>> + Send + '_>> {
        Box::pin(async move {
            self.begin_read()?;
            Ok(self.state.lock().unwrap().users.get(&user_id).cloned())
        })
    }
}

//! Room selection.
//!
//! Picks one free room out of the candidates the inventory service returned,
//! given the rooms storage reports as occupied for the requested stay.

use hotel_booking_core::booking::{OccupancySet, RoomId};

/// Outcome of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// This room is free for the whole stay
    Free(RoomId),
    /// No candidate is free (or there were no candidates)
    Exhausted,
}

/// Order in which candidates are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidateOrder {
    /// Inventory service order. Only as stable as the service's own ordering.
    #[default]
    AsReceived,
    /// Lowest room identifier first, independent of service ordering.
    Ascending,
}

/// Picks a free room. Pure and stateless apart from its scan order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityResolver {
    order: CandidateOrder,
}

impl AvailabilityResolver {
    /// Create a resolver scanning in `order`.
    #[must_use]
    pub const fn new(order: CandidateOrder) -> Self {
        Self { order }
    }

    /// Scan order in use.
    #[must_use]
    pub const fn order(&self) -> CandidateOrder {
        self.order
    }

    /// Return the first candidate not in `occupied`, or [`Availability::Exhausted`].
    #[must_use]
    pub fn resolve(&self, candidates: &[RoomId], occupied: &OccupancySet) -> Availability {
        match self.order {
            CandidateOrder::AsReceived => first_free(candidates, occupied),
            CandidateOrder::Ascending => candidates
                .iter()
                .copied()
                .filter(|room| !occupied.contains(room))
                .min()
                .map_or(Availability::Exhausted, Availability::Free),
        }
    }
}

/// First-match-wins scan in the order given.
#[must_use]
pub fn first_free(candidates: &[RoomId], occupied: &OccupancySet) -> Availability {
    candidates
        .iter()
        .copied()
        .find(|room| !occupied.contains(room))
        .map_or(Availability::Exhausted, Availability::Free)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::{hash_set, vec};
    use proptest::prelude::*;

    fn rooms(ids: &[i64]) -> Vec<RoomId> {
        ids.iter().copied().map(RoomId::new).collect()
    }

    fn occupied(ids: &[i64]) -> OccupancySet {
        ids.iter().copied().map(RoomId::new).collect()
    }

    #[test]
    fn skips_occupied_rooms() {
        let result = first_free(&rooms(&[101, 102]), &occupied(&[101]));
        assert_eq!(result, Availability::Free(RoomId::new(102)));
    }

    #[test]
    fn first_match_wins_in_received_order() {
        let result = first_free(&rooms(&[205, 203, 201]), &occupied(&[205]));
        assert_eq!(result, Availability::Free(RoomId::new(203)));
    }

    #[test]
    fn ascending_order_ignores_service_order() {
        let resolver = AvailabilityResolver::new(CandidateOrder::Ascending);
        let result = resolver.resolve(&rooms(&[205, 203, 201]), &occupied(&[205]));
        assert_eq!(result, Availability::Free(RoomId::new(201)));
    }

    #[test]
    fn empty_candidates_are_exhausted() {
        assert_eq!(first_free(&[], &occupied(&[])), Availability::Exhausted);
    }

    #[test]
    fn fully_occupied_is_exhausted() {
        let result = first_free(&rooms(&[1, 2, 3]), &occupied(&[1, 2, 3, 4]));
        assert_eq!(result, Availability::Exhausted);
    }

    proptest! {
        #[test]
        fn resolved_room_is_a_free_candidate(
            candidates in vec(1i64..50, 0..20),
            taken in hash_set(1i64..50, 0..30),
            ascending in any::<bool>(),
        ) {
            let candidates = rooms(&candidates);
            let occupied: OccupancySet = taken.iter().copied().map(RoomId::new).collect();
            let order = if ascending { CandidateOrder::Ascending } else { CandidateOrder::AsReceived };
            let resolver = AvailabilityResolver::new(order);

            match resolver.resolve(&candidates, &occupied) {
                Availability::Free(room) => {
                    prop_assert!(candidates.contains(&room));
                    prop_assert!(!occupied.contains(&room));
                }
                Availability::Exhausted => {
                    prop_assert!(candidates.iter().all(|room| occupied.contains(room)));
                }
            }
        }
    }
}

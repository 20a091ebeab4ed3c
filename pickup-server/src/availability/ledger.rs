//! Reservation ledger
//!
//! Serializes checkout admission per slot. Inside the slot's lock the ledger
//! reads the booked total, adds unexpired reservations, and admits the order
//! only if `booked + reserved + requested <= max_allowed`. A reservation lives
//! until the webhook records the booking or its TTL runs out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{AvailabilityChecker, CheckError};
use crate::store::SlotKey;

#[derive(Debug, Clone)]
struct Reservation {
    order_number: String,
    quantity: u64,
    expires_at: Instant,
}

impl Reservation {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Outcome of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted {
        total_booked: u64,
        reserved: u64,
        max_allowed: u64,
    },
    Full {
        total_booked: u64,
        reserved: u64,
        max_allowed: u64,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

type SlotReservations = Arc<Mutex<Vec<Reservation>>>;

pub struct ReservationLedger {
    slots: DashMap<SlotKey, SlotReservations>,
    ttl: Duration,
}

impl ReservationLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
        }
    }

    fn slot_reservations(&self, slot: &SlotKey) -> SlotReservations {
        self.slots.entry(slot.clone()).or_default().clone()
    }

    /// Try to reserve `quantity` units of `slot` for an order.
    ///
    /// Resubmitting the same order number replaces its earlier reservation.
    pub async fn admit(
        &self,
        checker: &AvailabilityChecker,
        slot: &SlotKey,
        order_number: &str,
        quantity: u64,
    ) -> Result<Admission, CheckError> {
        let max_allowed = checker.max_allowed(&slot.pickup_time)?;
        let reservations = self.slot_reservations(slot);
        let mut reservations = reservations.lock().await;

        let now = Instant::now();
        reservations.retain(|r| !r.is_expired(now) && r.order_number != order_number);

        let total_booked = checker.booked_total(slot).await?;
        let reserved = reservations
            .iter()
            .fold(0u64, |sum, r| sum.saturating_add(r.quantity));
        let demand = total_booked.saturating_add(reserved).saturating_add(quantity);

        if demand > max_allowed {
            tracing::info!(
                slot = %slot,
                order_number,
                total_booked,
                reserved,
                requested = quantity,
                max_allowed,
                "Slot full, admission refused"
            );
            return Ok(Admission::Full {
                total_booked,
                reserved,
                max_allowed,
            });
        }

        reservations.push(Reservation {
            order_number: order_number.to_string(),
            quantity,
            expires_at: now + self.ttl,
        });
        Ok(Admission::Admitted {
            total_booked,
            reserved,
            max_allowed,
        })
    }

    /// Drop an order's reservation; returns whether one existed
    pub async fn release(&self, slot: &SlotKey, order_number: &str) -> bool {
        let Some(reservations) = self.slots.get(slot).map(|r| r.value().clone()) else {
            return false;
        };
        let mut reservations = reservations.lock().await;
        let before = reservations.len();
        reservations.retain(|r| r.order_number != order_number);
        before != reservations.len()
    }

    /// Quantity currently held by unexpired reservations for a slot
    pub async fn reserved(&self, slot: &SlotKey) -> u64 {
        let Some(reservations) = self.slots.get(slot).map(|r| r.value().clone()) else {
            return 0;
        };
        let now = Instant::now();
        reservations
            .lock()
            .await
            .iter()
            .filter(|r| !r.is_expired(now))
            .fold(0u64, |sum, r| sum.saturating_add(r.quantity))
    }

    /// Remove expired reservations and idle slots; returns how many reservations expired
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.slots.retain(|_, reservations| {
            // Slots in use by an admission are skipped and retried next sweep
            let Ok(mut guard) = reservations.try_lock() else {
                return true;
            };
            let before = guard.len();
            guard.retain(|r| !r.is_expired(now));
            purged += before - guard.len();
            let idle = guard.is_empty();
            drop(guard);
            !(idle && Arc::strong_count(reservations) == 1)
        });
        if purged > 0 {
            tracing::debug!(purged, "Purged expired reservations");
        }
        purged
    }
}

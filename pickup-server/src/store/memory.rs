//! In-memory booking store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{BookingRecord, BookingStore, NewBooking, SlotKey, StoreError};

/// Process-local booking store.
///
/// Used with `BOOKING_STORE=memory` and as the store behind router tests.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    records: RwLock<Vec<BookingRecord>>,
    created: RwLock<Vec<NewBooking>>,
    next_id: AtomicU64,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing booking, returning its id
    pub fn insert(
        &self,
        pickup_date: impl Into<String>,
        pickup_time: impl Into<String>,
        quantity: u64,
    ) -> String {
        let id = self.next_record_id();
        self.records.write().push(BookingRecord {
            id: id.clone(),
            pickup_date: pickup_date.into(),
            pickup_time: pickup_time.into(),
            quantity,
        });
        id
    }

    /// Bookings appended through [`BookingStore::record_booking`], oldest first
    pub fn created_bookings(&self) -> Vec<NewBooking> {
        self.created.read().clone()
    }

    fn next_record_id(&self) -> String {
        format!("mem{:06}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_bookings(&self, slot: &SlotKey) -> Result<Vec<BookingRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.pickup_date == slot.pickup_date && r.pickup_time == slot.pickup_time)
            .cloned()
            .collect())
    }

    async fn record_booking(&self, booking: &NewBooking) -> Result<String, StoreError> {
        let id = self.insert(&booking.pickup_date, &booking.pickup_time, booking.quantity);
        self.created.write().push(booking.clone());
        Ok(id)
    }
}

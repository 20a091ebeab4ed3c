//! Order-capacity admission
//!
//! A slot is available while the quantity already booked for it stays
//! strictly below its capacity. The check reads current totals only; it
//! never reserves anything. [`ReservationLedger`] adds serialized admission
//! for checkout creation when `ADMISSION_MODE=reserve`.

mod ledger;

pub use ledger::{Admission, ReservationLedger};

use std::str::FromStr;
use std::sync::Arc;

use shared::models::AvailabilityResponse;
use thiserror::Error;

use crate::store::{BookingStore, SlotKey, StoreError};

/// Ceiling applied to slots missing from the capacity table
pub const DEFAULT_MAX_PER_SLOT: u64 = 1000;

/// Built-in slot table used when `SLOT_CAPACITIES` is not set
const STANDARD_SLOTS: &[(&str, u64)] = &[
    ("9.00", 20),
    ("9.30", 30),
    ("10.00", 40),
    ("10.30", 20),
    ("11.00", 20),
    ("11.30", 20),
    ("12.00", 30),
    ("12.30", 30),
    ("13.00", 30),
];

// ========== Capacity table ==========

/// Capacity lookup result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCapacity {
    Listed(u64),
    /// Slot is not in the table; carries the default ceiling
    Unlisted(u64),
}

impl SlotCapacity {
    pub fn max_allowed(self) -> u64 {
        match self {
            SlotCapacity::Listed(max) | SlotCapacity::Unlisted(max) => max,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapacityParseError {
    #[error("invalid slot capacity entry '{0}', expected label=capacity")]
    MalformedEntry(String),

    #[error("invalid capacity '{value}' for slot {label}")]
    InvalidCapacity { label: String, value: String },

    #[error("slot {0} is listed more than once")]
    DuplicateSlot(String),
}

/// Immutable mapping from slot label to maximum total quantity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityTable {
    entries: Vec<(String, u64)>,
    default_max: u64,
}

impl CapacityTable {
    pub fn new<I, S>(entries: I, default_max: u64) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut table = Self {
            entries: Vec::new(),
            default_max,
        };
        for (label, max) in entries {
            let label = label.into();
            match table.entries.iter_mut().find(|(l, _)| *l == label) {
                Some(entry) => entry.1 = max,
                None => table.entries.push((label, max)),
            }
        }
        table
    }

    /// The shop's standard morning slots
    pub fn standard(default_max: u64) -> Self {
        Self::new(STANDARD_SLOTS.iter().copied(), default_max)
    }

    /// Parse `label=capacity[,label=capacity...]`
    pub fn parse(table: &str, default_max: u64) -> Result<Self, CapacityParseError> {
        let mut entries: Vec<(String, u64)> = Vec::new();
        for raw in table.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (label, value) = raw
                .split_once('=')
                .map(|(l, v)| (l.trim(), v.trim()))
                .filter(|(l, _)| !l.is_empty())
                .ok_or_else(|| CapacityParseError::MalformedEntry(raw.to_string()))?;
            let max = value
                .parse::<u64>()
                .map_err(|_| CapacityParseError::InvalidCapacity {
                    label: label.to_string(),
                    value: value.to_string(),
                })?;
            if entries.iter().any(|(l, _)| l == label) {
                return Err(CapacityParseError::DuplicateSlot(label.to_string()));
            }
            entries.push((label.to_string(), max));
        }
        Ok(Self::new(entries, default_max))
    }

    pub fn lookup(&self, pickup_time: &str) -> SlotCapacity {
        self.entries
            .iter()
            .find(|(label, _)| label == pickup_time)
            .map(|(_, max)| SlotCapacity::Listed(*max))
            .unwrap_or(SlotCapacity::Unlisted(self.default_max))
    }

    pub fn max_allowed(&self, pickup_time: &str) -> u64 {
        self.lookup(pickup_time).max_allowed()
    }

    /// Listed slots in configuration order
    pub fn slots(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(label, max)| (label.as_str(), *max))
    }

    pub fn default_max(&self) -> u64 {
        self.default_max
    }
}

// ========== Policies ==========

/// What to do with a pickup time missing from the capacity table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownSlotPolicy {
    /// Admit against the default ceiling
    #[default]
    Admit,
    Reject,
}

impl FromStr for UnknownSlotPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admit" => Ok(Self::Admit),
            "reject" => Ok(Self::Reject),
            other => Err(format!("Unknown UNKNOWN_SLOT_POLICY: {other}")),
        }
    }
}

/// How checkout creation admits an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdmissionMode {
    /// Plain availability check, racy between check and booking
    #[default]
    Legacy,
    /// Serialized per slot through the reservation ledger
    Reserve,
}

impl FromStr for AdmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "reserve" => Ok(Self::Reserve),
            other => Err(format!("Unknown ADMISSION_MODE: {other}")),
        }
    }
}

// ========== Checker ==========

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown pickup time: {0}")]
    UnknownSlot(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityResult {
    pub pickup_date: String,
    pub pickup_time: String,
    pub total_booked: u64,
    pub max_allowed: u64,
    /// `total_booked < max_allowed`
    pub available: bool,
}

impl From<AvailabilityResult> for AvailabilityResponse {
    fn from(r: AvailabilityResult) -> Self {
        AvailabilityResponse {
            pickup_time: r.pickup_time,
            pickup_date: r.pickup_date,
            total_products_booked: r.total_booked,
            max_allowed: r.max_allowed,
            available: r.available,
        }
    }
}

/// Sums booked quantities for a slot and compares them to its capacity
#[derive(Clone)]
pub struct AvailabilityChecker {
    store: Arc<dyn BookingStore>,
    capacity: Arc<CapacityTable>,
    unknown_slot_policy: UnknownSlotPolicy,
}

impl AvailabilityChecker {
    pub fn new(
        store: Arc<dyn BookingStore>,
        capacity: CapacityTable,
        unknown_slot_policy: UnknownSlotPolicy,
    ) -> Self {
        Self {
            store,
            capacity: Arc::new(capacity),
            unknown_slot_policy,
        }
    }

    pub fn capacity(&self) -> &CapacityTable {
        &self.capacity
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    /// Capacity for a pickup time after applying the unknown-slot policy
    pub fn max_allowed(&self, pickup_time: &str) -> Result<u64, CheckError> {
        match (self.capacity.lookup(pickup_time), self.unknown_slot_policy) {
            (SlotCapacity::Listed(max), _) => Ok(max),
            (SlotCapacity::Unlisted(max), UnknownSlotPolicy::Admit) => Ok(max),
            (SlotCapacity::Unlisted(_), UnknownSlotPolicy::Reject) => {
                Err(CheckError::UnknownSlot(pickup_time.to_string()))
            }
        }
    }

    /// Total quantity already booked for a slot
    pub async fn booked_total(&self, slot: &SlotKey) -> Result<u64, StoreError> {
        let records = self.store.find_bookings(slot).await?;
        Ok(records
            .iter()
            .fold(0u64, |total, r| total.saturating_add(r.quantity)))
    }

    pub async fn check(
        &self,
        pickup_date: &str,
        pickup_time: &str,
    ) -> Result<AvailabilityResult, CheckError> {
        let max_allowed = self.max_allowed(pickup_time)?;
        let slot = SlotKey::new(pickup_date, pickup_time);
        let total_booked = self.booked_total(&slot).await?;

        let result = AvailabilityResult {
            pickup_date: slot.pickup_date,
            pickup_time: slot.pickup_time,
            total_booked,
            max_allowed,
            available: total_booked < max_allowed,
        };
        tracing::debug!(
            pickup_date = %result.pickup_date,
            pickup_time = %result.pickup_time,
            total_booked,
            max_allowed,
            available = result.available,
            "Availability checked"
        );
        Ok(result)
    }
}

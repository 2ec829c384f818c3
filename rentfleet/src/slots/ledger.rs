//! Slot ledger with per-vehicle serialization.
//!
//! Conflict-check-then-commit for one vehicle must be atomic: two requests
//! for overlapping windows must never both observe "no conflict". The
//! ledger hands out an async mutex per vehicle id; callers hold the guard
//! across the check, the duplicate guard, and the commit.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::booking::{BookingError, BookingResult, OperatingHours};
use crate::db::repository::SlotStore;

use super::models::TimeSlot;

/// Reservation calendar over all vehicles.
pub struct SlotLedger {
    store: Arc<dyn SlotStore>,
    vehicle_locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SlotLedger {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self {
            store,
            vehicle_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Acquire the mutual-exclusion scope for one vehicle's calendar.
    ///
    /// The returned guard must be held from the first conflict query until
    /// the slot commit.
    pub async fn lock_vehicle(&self, vehicle_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.vehicle_locks.lock().expect("vehicle lock map poisoned");
            Arc::clone(locks.entry(vehicle_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Validate a requested window against basic ordering and the owner's
    /// operating hours. Owners without configured hours accept any time of
    /// day.
    pub fn validate_window(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        hours: Option<&OperatingHours>,
    ) -> BookingResult<()> {
        if start >= end {
            return Err(BookingError::InvalidTimeWindow);
        }
        if let Some(hours) = hours {
            if !hours.contains(start.time()) || !hours.contains(end.time()) {
                return Err(BookingError::OutsideOperatingHours {
                    open: hours.open,
                    close: hours.close,
                });
            }
        }
        Ok(())
    }

    /// Whether an active slot for the vehicle overlaps `[start, end)`.
    pub async fn has_conflict(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BookingResult<bool> {
        if start >= end {
            return Err(BookingError::InvalidTimeWindow);
        }
        let overlapping = self.store.overlapping(vehicle_id, start, end).await?;
        Ok(!overlapping.is_empty())
    }

    /// Commit a reservation interval for a booking.
    pub async fn commit(
        &self,
        vehicle_id: Uuid,
        booking_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> BookingResult<TimeSlot> {
        if start >= end {
            return Err(BookingError::InvalidTimeWindow);
        }
        let slot = TimeSlot {
            id: Uuid::new_v4(),
            vehicle_id,
            booking_id,
            time_from: start,
            time_to: end,
            created_at: now,
        };
        self.store.insert(&slot).await?;
        Ok(slot)
    }

    /// Release every slot held by a booking. Returns the number removed.
    pub async fn release(&self, booking_id: Uuid) -> BookingResult<u64> {
        self.store.release_for_booking(booking_id).await
    }

    /// Slots for a vehicle that have not fully elapsed yet.
    pub async fn upcoming(
        &self,
        vehicle_id: Uuid,
        after: DateTime<Utc>,
    ) -> BookingResult<Vec<TimeSlot>> {
        self.store.upcoming_for_vehicle(vehicle_id, after).await
    }
}

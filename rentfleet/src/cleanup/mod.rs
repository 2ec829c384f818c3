//! Deferred reclamation of unpaid bookings.
//!
//! Every new booking commits its calendar slot optimistically while payment
//! is still outstanding. The scheduler fires a check after a grace period:
//! a booking still `PENDING` is auto-cancelled and its slot released.
//! Conflict prevention never depends on this running; the checks are
//! best-effort fire-and-forget timers.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::booking::{BookingResult, BookingStatus};
use crate::clock::Clock;
use crate::db::repository::BookingStore;
use crate::slots::SlotLedger;

const EXPIRY_REASON: &str = "payment window expired";

/// Reclaims bookings that never left `PENDING`.
pub struct CleanupScheduler {
    bookings: Arc<dyn BookingStore>,
    slots: Arc<SlotLedger>,
    grace: Duration,
    clock: Arc<dyn Clock>,
}

impl CleanupScheduler {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        slots: Arc<SlotLedger>,
        grace: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            slots,
            grace,
            clock,
        }
    }

    /// Schedule the deferred check for a newly created booking.
    pub fn schedule(&self, booking_id: Uuid) {
        let bookings = Arc::clone(&self.bookings);
        let slots = Arc::clone(&self.slots);
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            match reclaim_if_unpaid(bookings.as_ref(), &slots, booking_id).await {
                Ok(true) => log::info!("booking {booking_id} reclaimed: never paid"),
                Ok(false) => {}
                Err(e) => log::error!("cleanup of booking {booking_id} failed: {e}"),
            }
        });
        log::debug!(
            "cleanup scheduled for booking {booking_id} in {}s",
            self.grace.as_secs()
        );
    }

    /// Cancel the booking if it is still `PENDING` and release its slot.
    /// Returns whether anything was reclaimed.
    pub async fn reclaim(&self, booking_id: Uuid) -> BookingResult<bool> {
        reclaim_if_unpaid(self.bookings.as_ref(), &self.slots, booking_id).await
    }

    /// Reclaim every `PENDING` booking older than the grace period. Run at
    /// startup to cover timers lost with a previous process.
    pub async fn sweep(&self) -> BookingResult<usize> {
        let grace = chrono::Duration::from_std(self.grace).unwrap_or(chrono::Duration::zero());
        let cutoff = self.clock.now() - grace;
        let stale = self.bookings.stale_pending(cutoff).await?;
        let mut reclaimed = 0;
        for booking in stale {
            if self.reclaim(booking.id).await? {
                reclaimed += 1;
            }
        }
        if reclaimed > 0 {
            log::info!("startup sweep reclaimed {reclaimed} unpaid bookings");
        }
        Ok(reclaimed)
    }
}

async fn reclaim_if_unpaid(
    bookings: &dyn BookingStore,
    slots: &SlotLedger,
    booking_id: Uuid,
) -> BookingResult<bool> {
    let cancelled = bookings
        .cancel(booking_id, &[BookingStatus::Pending], 0, Some(EXPIRY_REASON))
        .await?;
    if cancelled {
        slots.release(booking_id).await?;
    }
    Ok(cancelled)
}

//! Booking state machine.
//!
//! Creation commits a calendar slot under the vehicle's mutual-exclusion
//! scope; every later transition is a compare-and-swap on the stored
//! status, so concurrent conflicting transitions leave exactly one winner
//! and the loser gets a state-conflict error naming the required source
//! state.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::cleanup::CleanupScheduler;
use crate::clock::Clock;
use crate::contract::FinalContract;
use crate::db::repository::{BookingStore, ContractStore, VehicleStore};
use crate::notify::{Notification, Notifier};
use crate::slots::SlotLedger;

use super::errors::{BookingError, BookingResult};
use super::models::{
    Booking, BookingStatus, Caller, CreateBookingRequest, is_valid_phone, new_transaction_ref,
    rental_cost,
};
use super::penalty::cancellation_penalty;

/// Result of a cancellation: what was withheld and what flows back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CancellationOutcome {
    pub penalty: i64,
    pub refund: i64,
}

/// Owner-provided completion details.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CompletionRequest {
    pub time_finish: DateTime<Utc>,
    pub cost_settlement: i64,
    pub note: Option<String>,
}

/// Orchestrates the booking lifecycle.
pub struct BookingManager {
    bookings: Arc<dyn BookingStore>,
    vehicles: Arc<dyn VehicleStore>,
    contracts: Arc<dyn ContractStore>,
    slots: Arc<SlotLedger>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    cleanup: Option<Arc<CleanupScheduler>>,
}

impl BookingManager {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        vehicles: Arc<dyn VehicleStore>,
        contracts: Arc<dyn ContractStore>,
        slots: Arc<SlotLedger>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            vehicles,
            contracts,
            slots,
            notifier,
            clock,
            cleanup: None,
        }
    }

    /// Attach the scheduler that reclaims bookings left unpaid.
    pub fn with_cleanup(mut self, cleanup: Arc<CleanupScheduler>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Create a booking in `PENDING`, committing its calendar slot.
    ///
    /// The conflict query, the duplicate-submission guard, and the slot
    /// commit all run while holding the vehicle's calendar lock; failure of
    /// any precondition aborts with no side effects.
    pub async fn create(
        &self,
        caller: &Caller,
        request: CreateBookingRequest,
    ) -> BookingResult<Booking> {
        let vehicle = self
            .vehicles
            .snapshot(request.vehicle_id)
            .await?
            .ok_or(BookingError::VehicleNotFound(request.vehicle_id))?;

        if caller.id == vehicle.owner_id {
            return Err(BookingError::OwnVehicle);
        }
        if !is_valid_phone(&request.phone_number) {
            return Err(BookingError::InvalidPhoneNumber);
        }
        SlotLedger::validate_window(
            request.time_start,
            request.time_end,
            vehicle.operating_hours.as_ref(),
        )?;

        let now = self.clock.now();
        let booking = Booking {
            id: Uuid::new_v4(),
            renter_id: caller.id,
            vehicle_id: vehicle.id,
            owner_id: vehicle.owner_id,
            time_start: request.time_start,
            time_end: request.time_end,
            address: request.address,
            phone_number: request.phone_number,
            total_cost: rental_cost(vehicle.cost_per_day, request.time_start, request.time_end),
            penalty: vehicle.penalty,
            transaction_ref: new_transaction_ref(),
            status: BookingStatus::Pending,
            cancel_penalty: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        };

        {
            let _calendar = self.slots.lock_vehicle(vehicle.id).await;

            if self
                .slots
                .has_conflict(vehicle.id, booking.time_start, booking.time_end)
                .await?
            {
                return Err(BookingError::SlotConflict);
            }
            if self
                .bookings
                .has_active_duplicate(caller.id, vehicle.id, booking.time_start, booking.time_end)
                .await?
            {
                return Err(BookingError::DuplicateBooking);
            }

            self.bookings.insert(&booking).await?;
            self.slots
                .commit(
                    vehicle.id,
                    booking.id,
                    booking.time_start,
                    booking.time_end,
                    now,
                )
                .await?;
        }

        if let Some(cleanup) = &self.cleanup {
            cleanup.schedule(booking.id);
        }

        log::info!(
            "booking {} created for vehicle {} ({} - {}), total {}",
            booking.id,
            vehicle.id,
            booking.time_start,
            booking.time_end,
            booking.total_cost
        );
        self.notifier.notify(
            booking.owner_id,
            Notification::BookingCreated { booking_id: booking.id },
        );

        Ok(booking)
    }

    pub async fn by_id(&self, id: Uuid) -> BookingResult<Booking> {
        self.bookings
            .by_id(id)
            .await?
            .ok_or(BookingError::BookingNotFound(id))
    }

    pub async fn list_for_renter(
        &self,
        renter_id: Uuid,
        status: Option<BookingStatus>,
    ) -> BookingResult<Vec<Booking>> {
        self.bookings.list_by_renter(renter_id, status).await
    }

    pub async fn list_by_status(&self, status: BookingStatus) -> BookingResult<Vec<Booking>> {
        self.bookings.list_by_status(status).await
    }

    /// Owner hands the vehicle over: `CONFIRMED → DELIVERED`.
    pub async fn deliver(&self, caller: &Caller, booking_id: Uuid) -> BookingResult<()> {
        let booking = self.by_id(booking_id).await?;
        if caller.id != booking.owner_id && !caller.is_staff() {
            return Err(BookingError::Unauthorized("deliver"));
        }
        self.step(
            booking_id,
            BookingStatus::Confirmed,
            BookingStatus::Delivered,
            "delivered",
        )
        .await
    }

    /// Renter acknowledges the handoff: `DELIVERED → RECEIVED_BY_CUSTOMER`.
    pub async fn receive(&self, caller: &Caller, booking_id: Uuid) -> BookingResult<()> {
        let booking = self.by_id(booking_id).await?;
        if caller.id != booking.renter_id {
            return Err(BookingError::Unauthorized("receive"));
        }
        self.step(
            booking_id,
            BookingStatus::Delivered,
            BookingStatus::ReceivedByCustomer,
            "received",
        )
        .await
    }

    /// Renter returns the vehicle: `RECEIVED_BY_CUSTOMER → RETURNED`.
    pub async fn return_vehicle(&self, caller: &Caller, booking_id: Uuid) -> BookingResult<()> {
        let booking = self.by_id(booking_id).await?;
        if caller.id != booking.renter_id {
            return Err(BookingError::Unauthorized("return"));
        }
        self.step(
            booking_id,
            BookingStatus::ReceivedByCustomer,
            BookingStatus::Returned,
            "returned",
        )
        .await
    }

    /// Owner settles the rental: `RETURNED → COMPLETED`.
    ///
    /// Marks the contract `FINISHED` with the provided settlement cost and
    /// creates the final contract record.
    pub async fn complete(
        &self,
        caller: &Caller,
        booking_id: Uuid,
        request: CompletionRequest,
    ) -> BookingResult<FinalContract> {
        let booking = self.by_id(booking_id).await?;
        if caller.id != booking.owner_id && !caller.is_staff() {
            return Err(BookingError::Unauthorized("complete"));
        }
        self.step(
            booking_id,
            BookingStatus::Returned,
            BookingStatus::Completed,
            "completed",
        )
        .await?;

        let contract = self
            .contracts
            .finish(booking_id, request.cost_settlement)
            .await?
            .ok_or(BookingError::ContractNotFound(booking_id))?;

        let record = FinalContract {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            booking_id,
            cost_settlement: request.cost_settlement,
            time_finish: request.time_finish,
            note: request.note,
            created_at: self.clock.now(),
        };
        self.contracts.insert_final(&record).await?;

        log::info!(
            "booking {booking_id} completed, settled at {}",
            request.cost_settlement
        );
        self.notifier.notify(
            booking.renter_id,
            Notification::BookingCompleted {
                booking_id,
                cost_settlement: request.cost_settlement,
            },
        );
        Ok(record)
    }

    /// Renter- or owner-initiated cancellation.
    pub async fn cancel(&self, caller: &Caller, booking_id: Uuid) -> BookingResult<CancellationOutcome> {
        self.cancel_inner(caller, booking_id, None).await
    }

    /// Owner-only cancellation for a renter who never showed up. The
    /// supplied reason is recorded on the booking.
    pub async fn cancel_no_show(
        &self,
        caller: &Caller,
        booking_id: Uuid,
        reason: &str,
    ) -> BookingResult<CancellationOutcome> {
        let booking = self.by_id(booking_id).await?;
        if caller.id != booking.owner_id {
            return Err(BookingError::Unauthorized("cancel"));
        }
        self.cancel_inner(caller, booking_id, Some(reason)).await
    }

    async fn cancel_inner(
        &self,
        caller: &Caller,
        booking_id: Uuid,
        no_show_reason: Option<&str>,
    ) -> BookingResult<CancellationOutcome> {
        let booking = self.by_id(booking_id).await?;
        let is_renter = caller.id == booking.renter_id;
        let is_owner = caller.id == booking.owner_id;
        if !is_renter && !is_owner {
            return Err(BookingError::Unauthorized("cancel"));
        }
        if !BookingStatus::CANCELLABLE.contains(&booking.status) {
            return Err(BookingError::CancelNotAllowed { status: booking.status });
        }

        let penalty = cancellation_penalty(
            &booking.penalty,
            booking.total_cost,
            booking.time_start,
            self.clock.now(),
        );

        let cancelled = self
            .bookings
            .cancel(
                booking_id,
                &BookingStatus::CANCELLABLE,
                penalty,
                no_show_reason,
            )
            .await?;
        if !cancelled {
            // Lost a race against a concurrent transition; report the
            // status that won.
            let status = self
                .bookings
                .by_id(booking_id)
                .await?
                .map(|b| b.status)
                .unwrap_or(booking.status);
            return Err(BookingError::CancelNotAllowed { status });
        }

        self.slots.release(booking_id).await?;

        let outcome = CancellationOutcome {
            penalty,
            refund: booking.total_cost - penalty,
        };
        log::info!(
            "booking {booking_id} cancelled ({}), penalty {penalty}",
            if no_show_reason.is_some() { "no-show" } else { "requested" }
        );
        let event = Notification::BookingCancelled {
            booking_id,
            penalty,
            no_show: no_show_reason.is_some(),
        };
        self.notifier.notify(booking.renter_id, event.clone());
        self.notifier.notify(booking.owner_id, event);

        Ok(outcome)
    }

    async fn step(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        action: &'static str,
    ) -> BookingResult<()> {
        let moved = self.bookings.transition(booking_id, from, to).await?;
        if !moved {
            return Err(BookingError::StateConflict { action, required: from });
        }
        log::info!("booking {booking_id} moved to {to}");
        Ok(())
    }
}

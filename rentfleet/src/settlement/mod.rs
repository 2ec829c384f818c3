//! Settlement coordination.
//!
//! Reconciles payment confirmations with booking state and the wallet
//! ledger. Three paths converge here:
//!
//! - a signed gateway callback confirming a booking payment
//! - a signed gateway callback confirming a wallet top-up
//! - a renter paying a booking directly from their wallet balance
//!
//! Each path is idempotent with respect to gateway retries: re-delivering a
//! callback that already settled is a no-op, never a double credit or a
//! second contract.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::booking::{Booking, BookingError, BookingStatus, Caller};
use crate::contract::Contract;
use crate::clock::Clock;
use crate::db::repository::{BookingStore, ContractStore, VehicleStore, WalletLedger};
use crate::notify::{Notification, Notifier};
use crate::payment::signature::SignatureVerifier;
use crate::payment::{SUCCESS_CODE, from_minor_units, param};
use crate::wallet::{ApprovalOutcome, WalletError};

/// Settlement errors.
///
/// Integrity failures (bad signature, amount mismatch) are logged here and
/// surface to the gateway only as a generic failure.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Signature verification failed
    #[error("callback signature rejected")]
    InvalidSignature,

    /// The gateway reported a non-success outcome
    #[error("gateway reported failure code {0}")]
    GatewayFailure(String),

    /// A required callback parameter is absent
    #[error("callback is missing parameter {0}")]
    MissingParameter(&'static str),

    /// A callback parameter did not parse
    #[error("callback parameter {0} is malformed")]
    MalformedParameter(&'static str),

    /// No booking or transaction matches the callback's reference
    #[error("no transaction matches reference {0}")]
    UnknownTransaction(String),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Result of a top-up callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopUpOutcome {
    Credited { new_balance: i64 },
    AlreadyCredited,
}

/// Drives a paid booking into its contracted state and credits confirmed
/// top-ups.
pub struct SettlementCoordinator {
    bookings: Arc<dyn BookingStore>,
    vehicles: Arc<dyn VehicleStore>,
    contracts: Arc<dyn ContractStore>,
    wallet: Arc<dyn WalletLedger>,
    verifier: SignatureVerifier,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl SettlementCoordinator {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        vehicles: Arc<dyn VehicleStore>,
        contracts: Arc<dyn ContractStore>,
        wallet: Arc<dyn WalletLedger>,
        verifier: SignatureVerifier,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            vehicles,
            contracts,
            wallet,
            verifier,
            notifier,
            clock,
        }
    }

    /// Handle an authenticated booking-payment callback.
    ///
    /// Looks up the booking by transaction reference, creates the
    /// `PROCESSING` contract, and confirms the booking. A callback that
    /// cannot be matched is rejected without side effects.
    pub async fn confirm_booking_payment(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Booking, SettlementError> {
        self.authenticate(params)?;
        let reference = require(params, param::TXN_REF)?;

        let booking = self
            .bookings
            .by_transaction_ref(reference)
            .await?
            .ok_or_else(|| SettlementError::UnknownTransaction(reference.to_string()))?;

        // a booking whose vehicle vanished cannot be contracted
        self.vehicles
            .snapshot(booking.vehicle_id)
            .await?
            .ok_or(BookingError::VehicleNotFound(booking.vehicle_id))?;

        if self.contracts.by_booking(booking.id).await?.is_some() {
            log::info!(
                "payment callback re-delivered for booking {}, ignoring",
                booking.id
            );
            return Ok(booking);
        }

        self.mark_paid(&booking).await?;
        Ok(booking)
    }

    /// Handle an authenticated wallet top-up callback.
    ///
    /// The transaction reference is the `PENDING` wallet transaction id;
    /// its declared amount must match the amount the gateway reports.
    pub async fn credit_top_up(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<TopUpOutcome, SettlementError> {
        self.authenticate(params)?;
        let reference = require(params, param::TXN_REF)?;
        let tx_id: Uuid = reference
            .parse()
            .map_err(|_| SettlementError::UnknownTransaction(reference.to_string()))?;
        let reported = require(params, param::AMOUNT)?
            .parse::<i64>()
            .ok()
            .and_then(from_minor_units)
            .ok_or(SettlementError::MalformedParameter(param::AMOUNT))?;

        let transaction = self
            .wallet
            .transaction_by_id(tx_id)
            .await?
            .ok_or_else(|| SettlementError::UnknownTransaction(reference.to_string()))?;

        match self.wallet.approve_pending(tx_id, Some(reported)).await? {
            ApprovalOutcome::Applied { new_balance } => {
                self.notifier.notify(
                    transaction.user_id,
                    Notification::TopUpCredited {
                        amount: transaction.amount,
                        new_balance,
                    },
                );
                log::info!("top-up {tx_id} credited, balance now {new_balance}");
                Ok(TopUpOutcome::Credited { new_balance })
            }
            ApprovalOutcome::AlreadyApproved => {
                log::info!("top-up callback re-delivered for {tx_id}, ignoring");
                Ok(TopUpOutcome::AlreadyCredited)
            }
        }
    }

    /// Pay a `PENDING` booking from the renter's wallet balance.
    ///
    /// An insufficient balance leaves the booking untouched.
    pub async fn pay_with_wallet(
        &self,
        caller: &Caller,
        booking_id: Uuid,
    ) -> Result<Booking, SettlementError> {
        let booking = self
            .bookings
            .by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        if caller.id != booking.renter_id {
            return Err(BookingError::Unauthorized("pay for").into());
        }
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::StateConflict {
                action: "paid",
                required: BookingStatus::Pending,
            }
            .into());
        }

        self.wallet
            .debit_for_booking(caller.id, booking.total_cost, booking.id)
            .await?;

        if let Err(e) = self.mark_paid(&booking).await {
            // the booking slipped out of PENDING while we debited; put the
            // money back before reporting the conflict
            self.wallet
                .credit_for_refund(caller.id, booking.total_cost, booking.id)
                .await?;
            return Err(e);
        }
        Ok(booking)
    }

    fn authenticate(&self, params: &HashMap<String, String>) -> Result<(), SettlementError> {
        if !self.verifier.verify(params) {
            log::warn!("rejected gateway callback with invalid signature");
            return Err(SettlementError::InvalidSignature);
        }
        let code = require(params, param::RESPONSE_CODE)?;
        if code != SUCCESS_CODE {
            return Err(SettlementError::GatewayFailure(code.to_string()));
        }
        Ok(())
    }

    async fn mark_paid(&self, booking: &Booking) -> Result<(), SettlementError> {
        let confirmed = self
            .bookings
            .transition(booking.id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await?;
        if !confirmed {
            return Err(BookingError::StateConflict {
                action: "paid",
                required: BookingStatus::Pending,
            }
            .into());
        }

        self.contracts
            .insert(&Contract::for_paid_booking(booking, self.clock.now()))
            .await?;

        log::info!("booking {} confirmed as paid", booking.id);
        self.notifier.notify(
            booking.renter_id,
            Notification::PaymentConfirmed { booking_id: booking.id },
        );
        self.notifier.notify(
            booking.owner_id,
            Notification::PaymentConfirmed { booking_id: booking.id },
        );
        Ok(())
    }
}

fn require<'a>(
    params: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, SettlementError> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or(SettlementError::MissingParameter(key))
}

//! # Rentfleet
//!
//! A vehicle-rental marketplace engine built around a strict multi-party
//! booking state machine and a double-entry style wallet ledger.
//!
//! The crate covers the lifecycle of a rental from the first availability
//! check to final settlement:
//!
//! - **Slot ledger**: committed reservation intervals per vehicle with
//!   serialized conflict-check-then-commit per vehicle calendar
//! - **Booking state machine**: `PENDING → CONFIRMED → DELIVERED →
//!   RECEIVED_BY_CUSTOMER → RETURNED → COMPLETED`, with cancellation from
//!   any pre-terminal state
//! - **Penalty policy**: pure time-based cancellation penalty evaluation
//! - **Wallet ledger**: per-user balances with `PENDING`/`APPROVED`/
//!   `CANCELLED` transactions that settle exactly once
//! - **Settlement**: reconciles signed payment-gateway callbacks and wallet
//!   debits with booking state and durable contract records
//! - **Cleanup**: reclaims bookings that were never paid within the grace
//!   period
//!
//! ## Core Modules
//!
//! - [`booking`]: Booking state machine, models, and penalty evaluation
//! - [`slots`]: Per-vehicle time-slot ledger and conflict queries
//! - [`wallet`]: Wallet balances and transaction ledger
//! - [`payment`]: Gateway redirect URLs and callback signature verification
//! - [`settlement`]: Payment/booking/ledger reconciliation
//! - [`cleanup`]: Deferred reclamation of unpaid bookings
//! - [`db`]: PostgreSQL pool, configuration, and repository traits

/// Booking lifecycle: models, state machine, and penalty policy.
pub mod booking;
pub use booking::{Booking, BookingError, BookingManager, BookingResult, BookingStatus};

/// Deferred reclamation of bookings that never left `PENDING`.
pub mod cleanup;
pub use cleanup::CleanupScheduler;

/// Injectable time source.
pub mod clock;
pub use clock::{Clock, SystemClock};

/// Durable contract records created at settlement and completion.
pub mod contract;

/// Database pool, configuration, and repository traits.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Fire-and-forget notification hook.
pub mod notify;
pub use notify::{LogNotifier, Notifier};

/// Payment gateway: redirect URL construction and callback signatures.
pub mod payment;
pub use payment::{GatewayConfig, PaymentGateway, SignatureVerifier};

/// Settlement coordination between payments, bookings, and the wallet.
pub mod settlement;
pub use settlement::SettlementCoordinator;

/// Per-vehicle reservation intervals and overlap queries.
pub mod slots;
pub use slots::SlotLedger;

/// Wallet balances and the transaction ledger.
pub mod wallet;
pub use wallet::{WalletError, WalletManager, WalletResult};

//! Wallet module providing per-user balances with a transaction ledger.
//!
//! This module implements:
//! - A balance invariant: the stored balance equals the sum of all
//!   `APPROVED` transaction amounts
//! - `PENDING` transactions that reserve intent (pending debits reduce the
//!   withdrawable amount) without moving the balance
//! - Settle-exactly-once semantics: only a `PENDING` transaction may move
//!   to `APPROVED` or `CANCELLED`, and re-delivery of an approval is a
//!   no-op rather than a double credit

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use manager::WalletManager;
pub use models::{ApprovalOutcome, TransactionStatus, Wallet, WalletTransaction};

//! Wallet error types.

use thiserror::Error;
use uuid::Uuid;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Wallet not found
    #[error("wallet not found for user {0}")]
    WalletNotFound(Uuid),

    /// Transaction not found
    #[error("wallet transaction {0} not found")]
    TransactionNotFound(Uuid),

    /// Insufficient balance
    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Amount must be strictly positive
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Transaction already left `PENDING` and may not settle again
    #[error("transaction {0} has already been settled")]
    AlreadySettled(Uuid),

    /// Declared amount does not match the amount reported by the gateway
    #[error("declared amount {declared} does not match reported amount {reported}")]
    AmountMismatch { declared: i64, reported: i64 },

    /// Caller does not own the transaction
    #[error("caller does not own transaction {0}")]
    NotOwner(Uuid),

    /// A status string from the outside did not parse
    #[error("unrecognized transaction status: {0}")]
    UnknownStatus(String),
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

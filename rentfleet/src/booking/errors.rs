//! Booking error types.

use chrono::NaiveTime;
use thiserror::Error;
use uuid::Uuid;

use super::models::BookingStatus;
use crate::wallet::WalletError;

/// Booking errors, grouped by the caller-facing failure class: validation,
/// conflict, not-found, authorization, and state-conflict.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Start must be strictly before end
    #[error("booking start must be before booking end")]
    InvalidTimeWindow,

    /// Phone number failed format validation
    #[error("phone number is not in a valid format")]
    InvalidPhoneNumber,

    /// Requested window falls outside the owner's operating hours
    #[error("requested window is outside the owner's operating hours ({open}-{close})")]
    OutsideOperatingHours { open: NaiveTime, close: NaiveTime },

    /// Owners cannot rent their own vehicles
    #[error("owners cannot book their own vehicle")]
    OwnVehicle,

    /// An active slot already covers part of the requested window
    #[error("vehicle is already booked for the requested window")]
    SlotConflict,

    /// The renter already has an active booking for the identical trip
    #[error("an active booking for this trip already exists")]
    DuplicateBooking,

    /// Booking not found
    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    /// Vehicle not found
    #[error("vehicle {0} not found")]
    VehicleNotFound(Uuid),

    /// No contract exists for the booking being settled
    #[error("no contract found for booking {0}")]
    ContractNotFound(Uuid),

    /// Caller is neither party to the booking nor staff
    #[error("caller is not allowed to {0} this booking")]
    Unauthorized(&'static str),

    /// Transition attempted from the wrong source state
    #[error("only {required} bookings may be {action}")]
    StateConflict {
        action: &'static str,
        required: BookingStatus,
    },

    /// Cancellation attempted from `RETURNED` or a terminal state
    #[error("a {status} booking can no longer be cancelled")]
    CancelNotAllowed { status: BookingStatus },

    /// A status string from the outside did not parse
    #[error("unrecognized status value: {0}")]
    UnknownStatus(String),

    /// Wallet error surfaced through a booking operation
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl BookingError {
    /// Whether the failure is a conflict over shared state, as opposed to a
    /// malformed request. Callers branch on this for retryability.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            BookingError::SlotConflict
                | BookingError::DuplicateBooking
                | BookingError::StateConflict { .. }
                | BookingError::CancelNotAllowed { .. }
                | BookingError::Wallet(WalletError::InsufficientBalance { .. })
        )
    }
}

/// Result type for booking operations.
pub type BookingResult<T> = Result<T, BookingError>;

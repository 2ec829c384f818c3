//! Booking module: the rental lifecycle state machine.
//!
//! This module implements:
//! - Booking creation with conflict-checked slot commitment
//! - The multi-party handoff state machine (owner delivers, renter receives,
//!   renter returns, owner completes)
//! - Cancellation with time-based penalty evaluation
//! - Snapshotting of the vehicle's penalty terms and the owner's operating
//!   hours at creation time, so later vehicle edits never change an
//!   in-flight booking's terms

pub mod errors;
pub mod manager;
pub mod models;
pub mod penalty;

pub use errors::{BookingError, BookingResult};
pub use manager::{BookingManager, CancellationOutcome, CompletionRequest};
pub use models::{
    Booking, BookingStatus, Caller, CreateBookingRequest, OperatingHours, PenaltyConfig,
    PenaltyKind, Role, VehicleSnapshot,
};
pub use penalty::cancellation_penalty;

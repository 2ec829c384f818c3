//! Booking data models.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::BookingError;

/// Lifecycle status of a booking.
///
/// `PENDING` is the unpaid entry state. Payment moves a booking to
/// `CONFIRMED`; the handoff chain then runs through `DELIVERED`,
/// `RECEIVED_BY_CUSTOMER`, and `RETURNED` before `COMPLETED`. `CANCELLED`
/// is reachable from every pre-`RETURNED` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Delivered,
    ReceivedByCustomer,
    Returned,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// States from which a booking may still be cancelled.
    pub const CANCELLABLE: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Delivered,
        BookingStatus::ReceivedByCustomer,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Delivered => "DELIVERED",
            BookingStatus::ReceivedByCustomer => "RECEIVED_BY_CUSTOMER",
            BookingStatus::Returned => "RETURNED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "DELIVERED" => Ok(BookingStatus::Delivered),
            "RECEIVED_BY_CUSTOMER" => Ok(BookingStatus::ReceivedByCustomer),
            "RETURNED" => Ok(BookingStatus::Returned),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::UnknownStatus(other.to_string())),
        }
    }
}

/// How a cancellation penalty is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PenaltyKind {
    Percent,
    Fixed,
}

impl fmt::Display for PenaltyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PenaltyKind::Percent => write!(f, "PERCENT"),
            PenaltyKind::Fixed => write!(f, "FIXED"),
        }
    }
}

impl FromStr for PenaltyKind {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PERCENT" => Ok(PenaltyKind::Percent),
            "FIXED" => Ok(PenaltyKind::Fixed),
            other => Err(BookingError::UnknownStatus(other.to_string())),
        }
    }
}

/// Cancellation terms, copied from the vehicle onto the booking at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    pub kind: PenaltyKind,
    /// Percentage for [`PenaltyKind::Percent`], flat amount for
    /// [`PenaltyKind::Fixed`].
    pub value: i64,
    /// Cancelling at least this many hours before the scheduled start is
    /// free.
    pub min_cancel_hours: i64,
}

/// An owner's daily open/close window for pickups and drop-offs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl OperatingHours {
    /// Whether a time of day falls inside the window. Windows where
    /// `open > close` wrap past midnight.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.open <= self.close {
            self.open <= t && t <= self.close
        } else {
            t >= self.open || t <= self.close
        }
    }
}

/// The slice of a vehicle record the booking engine needs at creation time.
///
/// Everything here is snapshotted onto the booking; the engine never reaches
/// back into live vehicle or owner records for an in-flight booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleSnapshot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub cost_per_day: i64,
    pub penalty: PenaltyConfig,
    pub operating_hours: Option<OperatingHours>,
}

/// Caller role as supplied by the external identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Staff,
    Admin,
}

impl FromStr for Role {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "STAFF" => Ok(Role::Staff),
            "ADMIN" => Ok(Role::Admin),
            other => Err(BookingError::UnknownStatus(other.to_string())),
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn user(id: Uuid) -> Self {
        Self { id, role: Role::User }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff | Role::Admin)
    }
}

/// One rental request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub renter_id: Uuid,
    pub vehicle_id: Uuid,
    /// Owner of the vehicle, snapshotted for authorization checks.
    pub owner_id: Uuid,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub address: String,
    pub phone_number: String,
    /// Whole currency units, `cost_per_day × billable days`.
    pub total_cost: i64,
    pub penalty: PenaltyConfig,
    /// Correlates the booking with a gateway transaction.
    pub transaction_ref: String,
    pub status: BookingStatus,
    /// Penalty charged on cancellation, if any.
    pub cancel_penalty: Option<i64>,
    /// Owner-supplied reason for a no-show cancellation.
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a booking.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub vehicle_id: Uuid,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub address: String,
    pub phone_number: String,
}

/// Days charged for a rental window, rounded up to whole days with a
/// minimum of one.
pub fn billable_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let minutes = (end - start).num_minutes();
    // Equivalent to `minutes.div_ceil(24 * 60)` (still unstable for i64 on
    // stable toolchains): round toward positive infinity for a positive divisor.
    let per_day = 24 * 60;
    let quotient = minutes / per_day;
    let days = if minutes % per_day > 0 { quotient + 1 } else { quotient };
    days.max(1)
}

/// Total rental cost for a window at a given per-day rate.
pub fn rental_cost(cost_per_day: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    cost_per_day.saturating_mul(billable_days(start, end))
}

/// Loose E.164-style phone check: optional leading `+`, then 8 to 15
/// digits.
pub fn is_valid_phone(raw: &str) -> bool {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// A fresh gateway transaction reference, e.g. `BOOK-1A2B3C4D`.
pub fn new_transaction_ref() -> String {
    format!("BOOK-{:08X}", rand::random::<u32>())
}

//! Contract data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::booking::{Booking, BookingError};

/// Contract status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Processing,
    Finished,
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Processing => "PROCESSING",
            ContractStatus::Finished => "FINISHED",
            ContractStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PROCESSING" => Ok(ContractStatus::Processing),
            "FINISHED" => Ok(ContractStatus::Finished),
            "CANCELLED" => Ok(ContractStatus::Cancelled),
            other => Err(BookingError::UnknownStatus(other.to_string())),
        }
    }
}

/// Settlement record linking a paid booking to its two parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub status: ContractStatus,
    /// Committed cost at payment time; revised by completion.
    pub cost_settlement: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// A fresh `PROCESSING` contract for a just-paid booking.
    pub fn for_paid_booking(booking: &Booking, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            renter_id: booking.renter_id,
            owner_id: booking.owner_id,
            status: ContractStatus::Processing,
            cost_settlement: booking.total_cost,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Completion record capturing the final settled cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalContract {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub booking_id: Uuid,
    pub cost_settlement: i64,
    pub time_finish: DateTime<Utc>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

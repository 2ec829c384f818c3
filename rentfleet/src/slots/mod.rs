//! Time-slot ledger: committed reservation intervals per vehicle.

pub mod ledger;
pub mod models;

pub use ledger::SlotLedger;
pub use models::TimeSlot;

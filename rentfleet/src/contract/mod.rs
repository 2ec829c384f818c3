//! Durable contract records.
//!
//! A `Contract` is created once a booking is paid; a `FinalContract` is
//! created once the rental completes and captures the settled cost. Both
//! are immutable after creation except for the contract status.

pub mod models;

pub use models::{Contract, ContractStatus, FinalContract};

//! Cancellation penalty policy.
//!
//! The evaluator is a pure function of the booking's penalty snapshot, its
//! total cost, the scheduled start, and the cancellation instant. It never
//! touches the booking itself; the state machine applies the result.

use chrono::{DateTime, Duration, Utc};

use super::models::{PenaltyConfig, PenaltyKind};

/// Penalty charged for cancelling at `cancel_time`.
///
/// Cancelling at or before `scheduled_start - min_cancel_hours` is free.
/// Inside the window, a `PERCENT` penalty charges `value%` of the total
/// cost and a `FIXED` penalty charges `value`, both bounded to
/// `[0, total_cost]`.
pub fn cancellation_penalty(
    config: &PenaltyConfig,
    total_cost: i64,
    scheduled_start: DateTime<Utc>,
    cancel_time: DateTime<Utc>,
) -> i64 {
    let deadline = scheduled_start - Duration::hours(config.min_cancel_hours.max(0));
    if cancel_time <= deadline {
        return 0;
    }
    match config.kind {
        PenaltyKind::Percent => (total_cost.saturating_mul(config.value) / 100).clamp(0, total_cost),
        PenaltyKind::Fixed => config.value.clamp(0, total_cost),
    }
}

//! Slot data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A committed reservation interval for one vehicle.
///
/// Intervals are half-open: `[time_from, time_to)`. Two slots whose
/// boundaries merely touch do not conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub booking_id: Uuid,
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TimeSlot {
    /// Half-open interval overlap against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.time_from < end && self.time_to > start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(from_h: u32, to_h: u32) -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            time_from: Utc.with_ymd_and_hms(2025, 9, 1, from_h, 0, 0).unwrap(),
            time_to: Utc.with_ymd_and_hms(2025, 9, 1, to_h, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn touching_boundaries_do_not_overlap() {
        let s = slot(10, 12);
        let noon = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let two = Utc.with_ymd_and_hms(2025, 9, 1, 14, 0, 0).unwrap();
        assert!(!s.overlaps(noon, two));

        let eight = Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap();
        let ten = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
        assert!(!s.overlaps(eight, ten));
    }

    #[test]
    fn containment_and_partial_overlap() {
        let s = slot(10, 14);
        let eleven = Utc.with_ymd_and_hms(2025, 9, 1, 11, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let four = Utc.with_ymd_and_hms(2025, 9, 1, 16, 0, 0).unwrap();
        assert!(s.overlaps(eleven, noon));
        assert!(s.overlaps(noon, four));
    }
}

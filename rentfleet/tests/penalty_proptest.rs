//! Property-based tests for the cancellation penalty policy.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rentfleet::booking::{PenaltyConfig, PenaltyKind, cancellation_penalty};

fn config_strategy() -> impl Strategy<Value = PenaltyConfig> {
    (
        prop_oneof![Just(PenaltyKind::Percent), Just(PenaltyKind::Fixed)],
        0i64..=10_000_000,
        0i64..=24 * 14,
    )
        .prop_map(|(kind, value, min_cancel_hours)| PenaltyConfig {
            kind,
            value: if kind == PenaltyKind::Percent {
                value % 101
            } else {
                value
            },
            min_cancel_hours,
        })
}

proptest! {
    #[test]
    fn penalty_is_bounded_by_total_cost(
        config in config_strategy(),
        total_cost in 0i64..=100_000_000,
        // cancellation anywhere from 30 days before start to start itself
        minutes_before_start in 0i64..=60 * 24 * 30,
    ) {
        let start = Utc.with_ymd_and_hms(2025, 10, 1, 10, 0, 0).unwrap();
        let cancel = start - Duration::minutes(minutes_before_start);
        let penalty = cancellation_penalty(&config, total_cost, start, cancel);

        prop_assert!(penalty >= 0, "penalty {penalty} went negative");
        prop_assert!(
            penalty <= total_cost,
            "penalty {penalty} exceeds total cost {total_cost}"
        );
    }

    #[test]
    fn cancelling_before_the_threshold_is_always_free(
        config in config_strategy(),
        total_cost in 0i64..=100_000_000,
        hours_early in 0i64..=1_000,
    ) {
        let start = Utc.with_ymd_and_hms(2025, 10, 1, 10, 0, 0).unwrap();
        let cancel = start - Duration::hours(config.min_cancel_hours + hours_early);
        prop_assert_eq!(cancellation_penalty(&config, total_cost, start, cancel), 0);
    }

    #[test]
    fn earlier_cancellation_never_costs_more(
        config in config_strategy(),
        total_cost in 0i64..=100_000_000,
        earlier in 0i64..=60 * 24 * 30,
        later in 0i64..=60 * 24 * 30,
    ) {
        let start = Utc.with_ymd_and_hms(2025, 10, 1, 10, 0, 0).unwrap();
        let (earlier, later) = (earlier.max(later), earlier.min(later));
        let early_penalty =
            cancellation_penalty(&config, total_cost, start, start - Duration::minutes(earlier));
        let late_penalty =
            cancellation_penalty(&config, total_cost, start, start - Duration::minutes(later));
        prop_assert!(early_penalty <= late_penalty);
    }
}

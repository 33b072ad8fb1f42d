//! Property tests for next-fire evaluation.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use dawnlock_core::schedule::{next_fire_time, DaySchedule, WeeklySchedule, ALL_DAYS};
use proptest::prelude::*;

/// Up to seven optional wake times, at least one set.
fn schedule_strategy() -> impl Strategy<Value = WeeklySchedule> {
    proptest::collection::vec(proptest::option::of((0u32..24, 0u32..60)), 7)
        .prop_filter("at least one active day", |days| days.iter().any(Option::is_some))
        .prop_map(|days| {
            let mut schedule = WeeklySchedule::default();
            for (weekday, slot) in ALL_DAYS.iter().zip(days) {
                if let Some((h, m)) = slot {
                    let wake = NaiveTime::from_hms_opt(h, m, 0).unwrap();
                    schedule.set_day(*weekday, Some(DaySchedule::new(wake)));
                }
            }
            schedule
        })
}

fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    // 2020-01-01 .. 2030-01-01, with sub-second noise.
    (1_577_836_800i64..1_893_456_000i64, 0u32..1_000_000_000)
        .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
}

proptest! {
    #[test]
    fn next_fire_is_after_now_within_a_week(schedule in schedule_strategy(), now in instant_strategy()) {
        let next = next_fire_time(&schedule, &now, None).unwrap();
        prop_assert!(next >= now - Duration::seconds(1));
        prop_assert!(next - now <= Duration::days(7));
        // Only an exact-second match may equal the truncated `now`.
        if next <= now {
            prop_assert_eq!(next.timestamp(), now.timestamp());
        }
    }

    #[test]
    fn iterating_fire_times_advances_monotonically(schedule in schedule_strategy(), now in instant_strategy()) {
        let mut last = next_fire_time(&schedule, &now, None).unwrap();
        for _ in 0..10 {
            let next = next_fire_time(&schedule, &last, Some(&last)).unwrap();
            prop_assert!(next > last, "{} !> {}", next, last);
            prop_assert!(next - last <= Duration::days(7));
            last = next;
        }
    }

    #[test]
    fn fired_instant_is_never_returned_again(schedule in schedule_strategy(), now in instant_strategy()) {
        let fire = next_fire_time(&schedule, &now, None).unwrap();
        let again = next_fire_time(&schedule, &fire, Some(&fire)).unwrap();
        prop_assert_ne!(again, fire);
    }
}

#[test]
fn single_day_schedule_wraps_to_next_week() {
    let schedule = WeeklySchedule::default().with_day(
        chrono::Weekday::Wed,
        DaySchedule::new(NaiveTime::from_hms_opt(6, 45, 0).unwrap()),
    );
    // Wednesday 2024-01-03, after the wake time.
    let now = Utc.with_ymd_and_hms(2024, 1, 3, 7, 0, 0).unwrap();
    let next = next_fire_time(&schedule, &now, None).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 10, 6, 45, 0).unwrap());
}

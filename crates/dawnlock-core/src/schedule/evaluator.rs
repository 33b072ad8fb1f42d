//! Next-fire and countdown computation over a [`WeeklySchedule`].
//!
//! All functions are generic over the time zone so the runner can work in
//! `Local` while tests pin `Utc`. Comparisons are made at second precision:
//! sub-second parts of `now` are dropped before matching.

use chrono::offset::LocalResult;
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, SubsecRound, TimeZone};
use serde::Serialize;

use super::weekly::WeeklySchedule;
use crate::error::ScheduleError;

/// Days scanned forward; eight so that today's slot is seen again next week.
const SCAN_DAYS: i64 = 8;

/// Dashboard countdown entry.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "DateTime<Tz>: Serialize"))]
pub struct UpcomingEvent<Tz: TimeZone> {
    pub label: String,
    pub at: DateTime<Tz>,
    /// Whole minutes until `at`, rounded down.
    pub minutes_left: i64,
}

/// Earliest wake instant after `now`.
///
/// An instant equal to `now` (at second precision) qualifies only if it has
/// not already fired, i.e. `last_fired` is not that same instant.
///
/// # Errors
///
/// [`ScheduleError::NoAlarmConfigured`] when no weekday has a wake time.
pub fn next_fire_time<Tz: TimeZone>(
    schedule: &WeeklySchedule,
    now: &DateTime<Tz>,
    last_fired: Option<&DateTime<Tz>>,
) -> Result<DateTime<Tz>, ScheduleError> {
    if !schedule.has_any_alarm() {
        return Err(ScheduleError::NoAlarmConfigured);
    }

    let now = now.clone().trunc_subsecs(0);
    let last_fired = last_fired.map(|f| f.clone().trunc_subsecs(0));
    let tz = now.timezone();
    let today = now.date_naive();

    for offset in 0..SCAN_DAYS {
        let date = today + Duration::days(offset);
        let Some(day) = schedule.day(date.weekday()) else {
            continue;
        };
        let candidate = resolve_local(&tz, date.and_time(day.wake_time));
        if candidate > now {
            return Ok(candidate);
        }
        if candidate == now && last_fired.as_ref() != Some(&candidate) {
            return Ok(candidate);
        }
    }

    // Only reachable when every configured day resolved to an instant at or
    // before `now`, which a full week of scanning rules out.
    Err(ScheduleError::NoAlarmConfigured)
}

/// The next countdown event: the first of today's events still ahead of
/// `now`, otherwise tomorrow's first event.
pub fn next_event<Tz: TimeZone>(
    schedule: &WeeklySchedule,
    now: &DateTime<Tz>,
) -> Option<UpcomingEvent<Tz>> {
    if let Some(first) = upcoming_events(schedule, now).into_iter().next() {
        return Some(first);
    }

    let now = now.clone().trunc_subsecs(0);
    let tz = now.timezone();
    let tomorrow = now.date_naive() + Duration::days(1);
    let day = schedule.day(tomorrow.weekday())?;
    let event = day.events_by_time().into_iter().next()?;
    let at = resolve_local(&tz, tomorrow.and_time(event.at));
    Some(UpcomingEvent {
        label: event.label.clone(),
        minutes_left: (at.clone() - now).num_minutes(),
        at,
    })
}

/// Every event left today, in time order.
pub fn upcoming_events<Tz: TimeZone>(
    schedule: &WeeklySchedule,
    now: &DateTime<Tz>,
) -> Vec<UpcomingEvent<Tz>> {
    let now = now.clone().trunc_subsecs(0);
    let tz = now.timezone();
    let today = now.date_naive();
    let Some(day) = schedule.day(today.weekday()) else {
        return Vec::new();
    };

    day.events_by_time()
        .into_iter()
        .filter_map(|event| {
            let at = resolve_local(&tz, today.and_time(event.at));
            (at > now).then(|| UpcomingEvent {
                label: event.label.clone(),
                minutes_left: (at.clone() - now.clone()).num_minutes(),
                at,
            })
        })
        .collect()
}

/// Map a wall-clock time onto `tz`. Ambiguous times (clocks going back) take
/// the earliest instant; times inside a gap (clocks going forward) move to the
/// first valid minute after the gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let mut candidate = naive;
            for _ in 0..(24 * 60) {
                candidate += Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
                    return dt;
                }
            }
            tz.from_utc_datetime(&naive)
        }
    }
}

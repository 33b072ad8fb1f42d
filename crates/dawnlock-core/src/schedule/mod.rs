//! Weekly wake-up schedule and the evaluator that turns it into fire times
//! and countdown events.

mod evaluator;
mod weekly;

pub use evaluator::{next_event, next_fire_time, upcoming_events, UpcomingEvent};
pub use weekly::{
    format_time_of_day, parse_time_of_day, DaySchedule, ScheduledEvent, WeeklySchedule, ALL_DAYS,
};

//! Weekly recurring wake-up schedule.
//!
//! Each weekday holds at most one [`DaySchedule`]; a missing day means no
//! alarm that day. Times of day serialize as `"HH:MM"` (or `"HH:MM:SS"` when
//! seconds are set) so the TOML stays hand-editable:
//!
//! ```toml
//! [schedule.monday]
//! wake_time = "07:00"
//! events = [{ label = "Breakfast", at = "07:30" }]
//! ```

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// A labelled point in the morning routine (breakfast, leave the house, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub label: String,
    #[serde(with = "time_of_day")]
    pub at: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(with = "time_of_day")]
    pub wake_time: NaiveTime,
    /// Ordered as the user wrote them; the evaluator sorts by time.
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
}

impl DaySchedule {
    pub fn new(wake_time: NaiveTime) -> Self {
        Self {
            wake_time,
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, label: impl Into<String>, at: NaiveTime) -> Self {
        self.events.push(ScheduledEvent {
            label: label.into(),
            at,
        });
        self
    }

    /// Events sorted by time of day, stable for equal times.
    pub fn events_by_time(&self) -> Vec<&ScheduledEvent> {
        let mut events: Vec<&ScheduledEvent> = self.events.iter().collect();
        events.sort_by_key(|e| e.at);
        events
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DaySchedule>,
}

impl WeeklySchedule {
    /// Weekdays wake at 07:00, weekends at 09:00, each with breakfast and a
    /// leave-the-house event.
    pub fn default_routine() -> Self {
        let weekday = DaySchedule::new(hm(7, 0))
            .with_event("Breakfast", hm(7, 30))
            .with_event("Leave House", hm(8, 15));
        let weekend = DaySchedule::new(hm(9, 0))
            .with_event("Breakfast", hm(9, 30))
            .with_event("Leave House", hm(10, 30));

        Self {
            monday: Some(weekday.clone()),
            tuesday: Some(weekday.clone()),
            wednesday: Some(weekday.clone()),
            thursday: Some(weekday.clone()),
            friday: Some(weekday),
            saturday: Some(weekend.clone()),
            sunday: Some(weekend),
        }
    }

    pub fn day(&self, weekday: Weekday) -> Option<&DaySchedule> {
        self.slot(weekday).as_ref()
    }

    pub fn set_day(&mut self, weekday: Weekday, day: Option<DaySchedule>) {
        *self.slot_mut(weekday) = day;
    }

    /// Builder form of [`set_day`](Self::set_day).
    pub fn with_day(mut self, weekday: Weekday, day: DaySchedule) -> Self {
        self.set_day(weekday, Some(day));
        self
    }

    pub fn active_days(&self) -> Vec<Weekday> {
        ALL_DAYS
            .iter()
            .copied()
            .filter(|d| self.day(*d).is_some())
            .collect()
    }

    pub fn has_any_alarm(&self) -> bool {
        ALL_DAYS.iter().any(|d| self.day(*d).is_some())
    }

    fn slot(&self, weekday: Weekday) -> &Option<DaySchedule> {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    fn slot_mut(&mut self, weekday: Weekday) -> &mut Option<DaySchedule> {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

pub const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Parse `"HH:MM"` or `"HH:MM:SS"`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ScheduleError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| ScheduleError::InvalidTime {
            value: value.to_string(),
        })
}

pub fn format_time_of_day(time: &NaiveTime) -> String {
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time_of_day(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time_of_day(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes_and_seconds() {
        assert_eq!(parse_time_of_day("07:00").unwrap(), hm(7, 0));
        assert_eq!(
            parse_time_of_day(" 06:59:30 ").unwrap(),
            NaiveTime::from_hms_opt(6, 59, 30).unwrap()
        );
    }

    #[test]
    fn rejects_out_of_range_times() {
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("7am").is_err());
        assert!(parse_time_of_day("12:60").is_err());
    }

    #[test]
    fn default_routine_covers_every_day() {
        let s = WeeklySchedule::default_routine();
        assert_eq!(s.active_days().len(), 7);
        assert_eq!(s.day(Weekday::Sat).unwrap().wake_time, hm(9, 0));
        assert_eq!(s.day(Weekday::Wed).unwrap().events.len(), 2);
    }

    #[test]
    fn missing_days_deserialize_as_no_alarm() {
        let s: WeeklySchedule = toml::from_str(
            r#"
            [monday]
            wake_time = "07:00"
            events = [{ label = "Breakfast", at = "07:30" }]
            "#,
        )
        .unwrap();
        assert_eq!(s.active_days(), vec![Weekday::Mon]);
        assert!(s.day(Weekday::Tue).is_none());
    }

    #[test]
    fn toml_roundtrip_keeps_times() {
        let s = WeeklySchedule::default().with_day(
            Weekday::Fri,
            DaySchedule::new(NaiveTime::from_hms_opt(6, 45, 15).unwrap()).with_event("Gym", hm(7, 30)),
        );
        let text = toml::to_string_pretty(&s).unwrap();
        assert!(text.contains("06:45:15"));
        let parsed: WeeklySchedule = toml::from_str(&text).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn events_by_time_sorts() {
        let day = DaySchedule::new(hm(7, 0))
            .with_event("Leave", hm(8, 15))
            .with_event("Breakfast", hm(7, 30));
        let labels: Vec<&str> = day.events_by_time().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Breakfast", "Leave"]);
    }
}

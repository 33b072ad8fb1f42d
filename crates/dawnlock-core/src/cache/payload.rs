//! Payload types for the dashboard records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub conditions: String,
}

impl WeatherReport {
    /// Symbol for the dashboard header.
    pub fn icon(&self) -> &'static str {
        let c = self.conditions.to_lowercase();
        if c.contains("clear") || c.contains("sun") {
            "☀"
        } else if c.contains("storm") || c.contains("thunder") {
            "⛈"
        } else if c.contains("snow") || c.contains("sleet") {
            "❄"
        } else if c.contains("rain") || c.contains("drizzle") || c.contains("shower") {
            "🌧"
        } else if c.contains("cloud") || c.contains("overcast") {
            "☁"
        } else if c.contains("mist") || c.contains("fog") {
            "🌫"
        } else {
            "🌡"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsDigest {
    #[serde(default)]
    pub headlines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    /// Actionable to-do item.
    Task,
    /// General information.
    Note,
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderKind::Task => f.write_str("task"),
            ReminderKind::Note => f.write_str("note"),
        }
    }
}

impl FromStr for ReminderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" => Ok(ReminderKind::Task),
            "note" => Ok(ReminderKind::Note),
            other => Err(format!("unknown reminder kind '{other}' (task, note)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub kind: ReminderKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

/// User-authored reminders. Never expire on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminders {
    #[serde(default)]
    pub items: Vec<Reminder>,
}

impl Reminders {
    pub fn tasks(&self) -> impl Iterator<Item = &Reminder> {
        self.items.iter().filter(|r| r.kind == ReminderKind::Task)
    }

    pub fn notes(&self) -> impl Iterator<Item = &Reminder> {
        self.items.iter().filter(|r| r.kind == ReminderKind::Note)
    }
}

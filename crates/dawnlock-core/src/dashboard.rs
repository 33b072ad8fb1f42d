//! Morning dashboard shown once the alarm is disabled.
//!
//! Assembly reads whatever the cache holds. A missing or unreadable record
//! becomes an empty panel with a warning; assembly itself never fails.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::warn;

use crate::cache::{CacheRecord, CacheSource, CacheStore, NewsDigest, RecordName, Reminders, WeatherReport};
use crate::schedule::{next_event, upcoming_events, UpcomingEvent, WeeklySchedule};
use crate::updater::{FeedKind, UpdaterPolicy};

/// A cached feed as the dashboard shows it.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPanel<T> {
    pub payload: T,
    pub updated_at: DateTime<Utc>,
    pub source: CacheSource,
    /// Older than the kind's staleness threshold.
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "DateTime<Tz>: Serialize"))]
pub struct Dashboard<Tz: TimeZone> {
    pub generated_at: DateTime<Tz>,
    pub reminders: Option<Reminders>,
    pub weather: Option<FeedPanel<WeatherReport>>,
    pub news: Option<FeedPanel<NewsDigest>>,
    /// Today's remaining events.
    pub upcoming: Vec<UpcomingEvent<Tz>>,
    pub next_event: Option<UpcomingEvent<Tz>>,
}

impl<Tz: TimeZone> Dashboard<Tz> {
    pub fn assemble(
        store: &CacheStore,
        schedule: &WeeklySchedule,
        policy: &UpdaterPolicy,
        now: DateTime<Tz>,
    ) -> Self {
        let utc_now = now.with_timezone(&Utc);
        let reminders = load_or_warn::<Reminders>(store, RecordName::Reminders).map(|r| r.payload);
        let weather = load_or_warn(store, RecordName::Weather)
            .map(|r| panel(r, utc_now, policy, FeedKind::Weather));
        let news = load_or_warn(store, RecordName::News).map(|r| panel(r, utc_now, policy, FeedKind::News));

        Self {
            upcoming: upcoming_events(schedule, &now),
            next_event: next_event(schedule, &now),
            generated_at: now,
            reminders,
            weather,
            news,
        }
    }
}

impl<Tz: TimeZone> Dashboard<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    /// Plain-text rendering for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "== Reminders & Notes ==");
        match &self.reminders {
            Some(r) if !r.items.is_empty() => {
                let tasks: Vec<_> = r.tasks().collect();
                let notes: Vec<_> = r.notes().collect();
                if !tasks.is_empty() {
                    let _ = writeln!(out, "Tasks:");
                    for t in tasks {
                        let _ = writeln!(out, "  • {}", t.content);
                    }
                }
                if !notes.is_empty() {
                    let _ = writeln!(out, "Notes:");
                    for n in notes {
                        let _ = writeln!(out, "  • {}", n.content);
                    }
                }
            }
            _ => {
                let _ = writeln!(out, "  No reminders for today.");
            }
        }

        let _ = writeln!(out, "\n== Weather ==");
        match &self.weather {
            Some(w) => {
                let _ = writeln!(
                    out,
                    "  {} {}  {:.1}°C",
                    w.payload.icon(),
                    w.payload.conditions,
                    w.payload.temperature_c
                );
                let _ = writeln!(out, "  {}", freshness(w, &self.generated_at.timezone()));
            }
            None => {
                let _ = writeln!(out, "  No weather data.");
            }
        }

        let _ = writeln!(out, "\n== News ==");
        match &self.news {
            Some(n) if !n.payload.headlines.is_empty() => {
                for h in &n.payload.headlines {
                    let _ = writeln!(out, "  • {h}");
                }
                let _ = writeln!(out, "  {}", freshness(n, &self.generated_at.timezone()));
            }
            Some(_) => {
                let _ = writeln!(out, "  No headlines.");
            }
            None => {
                let _ = writeln!(out, "  No news data.");
            }
        }

        let _ = writeln!(out, "\n== Countdown ==");
        if self.upcoming.is_empty() {
            match &self.next_event {
                Some(e) => {
                    let _ = writeln!(
                        out,
                        "  Nothing left today. Next: {} at {}",
                        e.label,
                        e.at.format("%a %H:%M")
                    );
                }
                None => {
                    let _ = writeln!(out, "  No events scheduled.");
                }
            }
        } else {
            for e in &self.upcoming {
                let _ = writeln!(
                    out,
                    "  {:<20} {}  ({})",
                    e.label,
                    e.at.format("%H:%M"),
                    minutes_left(e.minutes_left)
                );
            }
        }
        out
    }
}

fn load_or_warn<T: DeserializeOwned>(store: &CacheStore, name: RecordName) -> Option<CacheRecord<T>> {
    match store.load_record::<T>(name) {
        Ok(record) => record,
        Err(e) => {
            warn!(record = %name, error = %e, "record unreadable, showing as absent");
            None
        }
    }
}

fn panel<T>(record: CacheRecord<T>, now: DateTime<Utc>, policy: &UpdaterPolicy, kind: FeedKind) -> FeedPanel<T> {
    FeedPanel {
        stale: record.is_stale(now, policy.stale_after(kind)),
        updated_at: record.updated_at,
        source: record.source,
        payload: record.payload,
    }
}

fn freshness<T, Tz: TimeZone>(panel: &FeedPanel<T>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut line = format!("Updated: {}", panel.updated_at.with_timezone(tz).format("%Y-%m-%d %H:%M"));
    if panel.source == CacheSource::StaleFallback {
        line.push_str(" (offline, showing last known)");
    } else if panel.stale {
        line.push_str(" (stale)");
    }
    line
}

fn minutes_left(minutes: i64) -> String {
    if minutes >= 60 {
        format!("in {}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("in {minutes} min")
    }
}

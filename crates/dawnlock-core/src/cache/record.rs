use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the payload of a record last came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheSource {
    #[default]
    Live,
    /// The last refresh failed; the payload is the previous good one.
    StaleFallback,
}

/// A cached payload with its last successful update time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub payload: T,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub source: CacheSource,
}

impl<T> CacheRecord<T> {
    pub fn live(payload: T, updated_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            updated_at,
            source: CacheSource::Live,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.updated_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.age(now) > threshold
    }

    /// Keep payload and `updated_at`, flag the record as a fallback.
    pub fn mark_stale_fallback(&mut self) {
        self.source = CacheSource::StaleFallback;
    }
}

/// Every record the store knows about, one JSON file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordName {
    Weather,
    News,
    Reminders,
    PuzzleHistory,
    AlarmLedger,
    Heartbeat,
}

impl RecordName {
    pub fn file_name(self) -> &'static str {
        match self {
            RecordName::Weather => "weather.json",
            RecordName::News => "news.json",
            RecordName::Reminders => "reminders.json",
            RecordName::PuzzleHistory => "puzzle_history.json",
            RecordName::AlarmLedger => "alarm_ledger.json",
            RecordName::Heartbeat => "heartbeat.json",
        }
    }
}

impl fmt::Display for RecordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name().trim_end_matches(".json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staleness_is_strictly_greater_than_threshold() {
        let now = Utc::now();
        let record = CacheRecord::live((), now - Duration::minutes(60));
        assert!(!record.is_stale(now, Duration::minutes(60)));
        assert!(record.is_stale(now, Duration::minutes(59)));
    }

    #[test]
    fn source_serializes_kebab_case() {
        let mut record = CacheRecord::live(1u8, Utc::now());
        record.mark_stale_fallback();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "stale-fallback");
    }

    #[test]
    fn missing_source_defaults_to_live() {
        let record: CacheRecord<u8> =
            serde_json::from_str(r#"{"payload": 3, "updated_at": "2024-01-01T07:00:00Z"}"#).unwrap();
        assert_eq!(record.source, CacheSource::Live);
    }
}

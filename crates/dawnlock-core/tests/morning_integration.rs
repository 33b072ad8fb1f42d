//! Integration tests for the post-alarm morning flow: feed refresh with
//! offline fallback, then dashboard assembly from whatever is cached.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dawnlock_core::cache::{CacheRecord, CacheSource, CacheStore, RecordName, Reminder, ReminderKind, WeatherReport};
use dawnlock_core::dashboard::Dashboard;
use dawnlock_core::error::FetchError;
use dawnlock_core::schedule::WeeklySchedule;
use dawnlock_core::updater::{FeedKind, FeedPayload, Fetcher, HttpFetcher, RefreshOutcome, UpdaterCoordinator, UpdaterPolicy};
use std::sync::Arc;

struct Offline;

#[async_trait]
impl Fetcher for Offline {
    async fn fetch(&self, _kind: FeedKind) -> Result<FeedPayload, FetchError> {
        Err(FetchError::Status { status: 503 })
    }
}

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

#[tokio::test]
async fn test_weather_fails_twice_and_dashboard_still_assembles() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let last_good = at("2024-01-01T01:00:00Z");
    let report = WeatherReport {
        temperature_c: -1.5,
        conditions: "Partly cloudy".into(),
    };
    store
        .save_record(RecordName::Weather, &CacheRecord::live(report.clone(), last_good))
        .unwrap();
    store
        .append_reminder(
            Reminder {
                kind: ReminderKind::Note,
                content: "Bin day".into(),
                added_at: None,
            },
            last_good,
        )
        .unwrap();

    let mut updater = UpdaterCoordinator::new(Arc::new(Offline), store.clone(), UpdaterPolicy::default());
    for now in [at("2024-01-01T06:45:00Z"), at("2024-01-01T06:50:00Z")] {
        let outcome = updater.refresh(FeedKind::Weather, now).await;
        assert!(matches!(outcome, RefreshOutcome::StaleFallback { .. }));
    }

    let record: CacheRecord<WeatherReport> = store.load_record(RecordName::Weather).unwrap().unwrap();
    assert_eq!(record.source, CacheSource::StaleFallback);
    assert_eq!(record.updated_at, last_good);
    assert_eq!(record.payload, report);

    let dashboard = Dashboard::assemble(
        &store,
        &WeeklySchedule::default_routine(),
        updater.policy(),
        at("2024-01-01T07:05:00Z"),
    );
    let weather = dashboard.weather.as_ref().unwrap();
    assert!(weather.stale);
    assert_eq!(weather.payload, report);
    assert!(dashboard.news.is_none());
    assert_eq!(dashboard.reminders.as_ref().unwrap().notes().count(), 1);
    assert!(dashboard.render().contains("Bin day"));
}

#[tokio::test]
async fn test_http_refresh_cycle_against_mock_server() {
    let mut server = mockito::Server::new_async().await;
    let _weather = server
        .mock("GET", "/v1/current.json")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"current": {"temp_c": 12.0, "condition": {"text": "Sunny"}}}"#)
        .create_async()
        .await;
    let _news = server
        .mock("GET", "/v2/top-headlines")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "ok", "articles": [{"title": "Local team wins"}, {"title": "Rain expected"}]}"#)
        .create_async()
        .await;

    let fetcher = HttpFetcher::new(
        Some(&format!("{}/v1/current.json?key=k&q=Oslo", server.url())),
        Some(&format!("{}/v2/top-headlines?country=no&apiKey=k", server.url())),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let mut updater = UpdaterCoordinator::new(Arc::new(fetcher), store.clone(), UpdaterPolicy::default());
    let now = at("2024-01-01T06:00:00Z");

    let outcomes = updater.refresh_due(now).await;
    assert_eq!(
        outcomes,
        vec![
            (FeedKind::Weather, RefreshOutcome::Live),
            (FeedKind::News, RefreshOutcome::Live)
        ]
    );

    let dashboard = Dashboard::assemble(
        &store,
        &WeeklySchedule::default_routine(),
        updater.policy(),
        now + Duration::minutes(70),
    );
    assert_eq!(dashboard.news.as_ref().unwrap().payload.headlines.len(), 2);
    let weather = dashboard.weather.as_ref().unwrap();
    assert!(!weather.stale);
    assert_eq!(weather.source, CacheSource::Live);
}

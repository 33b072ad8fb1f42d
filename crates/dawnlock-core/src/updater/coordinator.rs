//! Keeps the weather/news records fresh without ever blocking the alarm.
//!
//! A refresh is split in two so the runner can drive fetches from spawned
//! tasks: [`UpdaterCoordinator::fetch_task`] produces a `'static` future
//! bounded by the fetch timeout, and [`UpdaterCoordinator::apply`] writes
//! the outcome back on the owning task.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::fetcher::{FeedKind, FeedPayload, Fetcher};
use crate::cache::{CacheRecord, CacheStore, NewsDigest, WeatherReport};
use crate::error::{FetchError, PersistenceError};
use crate::events::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterPolicy {
    pub cadence: Duration,
    pub weather_stale_after: Duration,
    pub news_stale_after: Duration,
    pub fetch_timeout: std::time::Duration,
    /// Opportunistic refreshes before an alarm.
    pub check_internet: bool,
}

impl Default for UpdaterPolicy {
    fn default() -> Self {
        Self {
            cadence: Duration::hours(6),
            weather_stale_after: Duration::hours(3),
            news_stale_after: Duration::hours(6),
            fetch_timeout: std::time::Duration::from_secs(10),
            check_internet: true,
        }
    }
}

impl UpdaterPolicy {
    pub fn stale_after(&self, kind: FeedKind) -> Duration {
        match kind {
            FeedKind::Weather => self.weather_stale_after,
            FeedKind::News => self.news_stale_after,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Staleness {
    Fresh,
    Stale,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RefreshOutcome {
    Live,
    /// Fetch failed, the previous payload was kept and flagged.
    StaleFallback { reason: String },
    /// Fetch failed with nothing cached, or the record could not be written.
    Failed { reason: String },
}

impl RefreshOutcome {
    pub fn event(&self, kind: FeedKind, at: DateTime<Utc>) -> Event {
        match self {
            RefreshOutcome::Live => Event::FeedRefreshed { kind, at },
            RefreshOutcome::StaleFallback { reason } | RefreshOutcome::Failed { reason } => {
                Event::FeedFallback {
                    kind,
                    reason: reason.clone(),
                    at,
                }
            }
        }
    }
}

pub struct UpdaterCoordinator {
    fetcher: Arc<dyn Fetcher>,
    store: CacheStore,
    policy: UpdaterPolicy,
    /// Kinds that failed since the last cadence tick.
    backoff: HashSet<FeedKind>,
    in_flight: HashSet<FeedKind>,
}

impl UpdaterCoordinator {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: CacheStore, policy: UpdaterPolicy) -> Self {
        Self {
            fetcher,
            store,
            policy,
            backoff: HashSet::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn policy(&self) -> &UpdaterPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: UpdaterPolicy) {
        self.policy = policy;
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn in_backoff(&self, kind: FeedKind) -> bool {
        self.backoff.contains(&kind)
    }

    pub fn staleness(&self, kind: FeedKind, now: DateTime<Utc>) -> Staleness {
        match self.store.load_record::<serde_json::Value>(kind.record_name()) {
            Ok(Some(record)) if record.is_stale(now, self.policy.stale_after(kind)) => Staleness::Stale,
            Ok(Some(_)) => Staleness::Fresh,
            Ok(None) => Staleness::Absent,
            Err(e) => {
                warn!(%kind, error = %e, "unreadable feed record, treating as absent");
                Staleness::Absent
            }
        }
    }

    /// Whether an opportunistic refresh should run now.
    pub fn wants_refresh(&self, kind: FeedKind, now: DateTime<Utc>) -> bool {
        self.policy.check_internet
            && !self.backoff.contains(&kind)
            && !self.in_flight.contains(&kind)
            && self.staleness(kind, now) != Staleness::Fresh
    }

    /// Start of a cadence tick: lift back-off and return every kind not
    /// already being fetched.
    pub fn begin_cadence_tick(&mut self) -> Vec<FeedKind> {
        self.backoff.clear();
        FeedKind::ALL
            .into_iter()
            .filter(|kind| !self.in_flight.contains(kind))
            .collect()
    }

    /// Forget every pending fetch, e.g. after the tasks running them were
    /// lost without reaching [`apply`](Self::apply).
    pub fn clear_in_flight(&mut self) {
        self.in_flight.clear();
    }

    /// Fetch future for `kind`, bounded by the fetch timeout. Pair every
    /// call with [`apply`](Self::apply).
    pub fn fetch_task(
        &mut self,
        kind: FeedKind,
    ) -> impl Future<Output = Result<FeedPayload, FetchError>> + Send + 'static {
        self.in_flight.insert(kind);
        let fetcher = Arc::clone(&self.fetcher);
        let timeout = self.policy.fetch_timeout;
        async move {
            match tokio::time::timeout(timeout, fetcher.fetch(kind)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    timeout_secs: timeout.as_secs(),
                }),
            }
        }
    }

    /// Write a fetch result into the store.
    ///
    /// Success overwrites the record as live. Failure keeps the previous
    /// payload and `updated_at`, flags it as a fallback and puts the kind in
    /// back-off until the next cadence tick.
    pub fn apply(
        &mut self,
        kind: FeedKind,
        result: Result<FeedPayload, FetchError>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        self.in_flight.remove(&kind);

        let saved = match result {
            Ok(FeedPayload::Weather(report)) => self
                .store
                .save_record(kind.record_name(), &CacheRecord::live(report, now)),
            Ok(FeedPayload::News(digest)) => self
                .store
                .save_record(kind.record_name(), &CacheRecord::live(digest, now)),
            Err(e) => return self.fall_back(kind, &e),
        };

        match saved {
            Ok(()) => {
                self.backoff.remove(&kind);
                info!(%kind, "feed refreshed");
                RefreshOutcome::Live
            }
            Err(e) => {
                error!(%kind, error = %e, "failed to save feed record");
                RefreshOutcome::Failed { reason: e.to_string() }
            }
        }
    }

    fn fall_back(&mut self, kind: FeedKind, cause: &FetchError) -> RefreshOutcome {
        self.backoff.insert(kind);
        let reason = cause.to_string();
        warn!(%kind, error = %reason, "feed refresh failed, keeping cached data");

        // Round-trip through the payload's own type so the stored payload
        // keeps its exact bytes.
        let flagged = match kind {
            FeedKind::Weather => self.flag_stale::<WeatherReport>(kind),
            FeedKind::News => self.flag_stale::<NewsDigest>(kind),
        };
        match flagged {
            Ok(true) => RefreshOutcome::StaleFallback { reason },
            Ok(false) => RefreshOutcome::Failed { reason },
            Err(e) => {
                error!(%kind, error = %e, "failed to read feed record");
                RefreshOutcome::Failed { reason }
            }
        }
    }

    /// Mark the stored record as a fallback. `Ok(false)` when there is none.
    fn flag_stale<T>(&self, kind: FeedKind) -> Result<bool, PersistenceError>
    where
        T: Serialize + DeserializeOwned,
    {
        let name = kind.record_name();
        let Some(mut record) = self.store.load_record::<T>(name)? else {
            return Ok(false);
        };
        record.mark_stale_fallback();
        if let Err(e) = self.store.save_record(name, &record) {
            error!(%kind, error = %e, "failed to flag feed record");
        }
        Ok(true)
    }

    /// Fetch and store `kind` now, regardless of back-off.
    pub async fn refresh(&mut self, kind: FeedKind, now: DateTime<Utc>) -> RefreshOutcome {
        let result = self.fetch_task(kind).await;
        self.apply(kind, result, now)
    }

    /// Refresh only when [`wants_refresh`](Self::wants_refresh) says so.
    pub async fn refresh_if_stale(
        &mut self,
        kind: FeedKind,
        now: DateTime<Utc>,
    ) -> Option<RefreshOutcome> {
        if !self.wants_refresh(kind, now) {
            return None;
        }
        Some(self.refresh(kind, now).await)
    }

    /// Cadence tick: refresh every kind.
    pub async fn refresh_due(&mut self, now: DateTime<Utc>) -> Vec<(FeedKind, RefreshOutcome)> {
        let mut outcomes = Vec::new();
        for kind in self.begin_cadence_tick() {
            outcomes.push((kind, self.refresh(kind, now).await));
        }
        outcomes
    }
}

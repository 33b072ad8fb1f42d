//! Liveness record for an external supervisor.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmPhase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub pid: u32,
    pub beat_at: DateTime<Utc>,
    pub phase: AlarmPhase,
    pub next_fire_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Alive,
    Stale,
}

impl Heartbeat {
    pub fn now(phase: AlarmPhase, next_fire_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            pid: std::process::id(),
            beat_at: now,
            phase,
            next_fire_at,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.beat_at
    }

    pub fn liveness(&self, now: DateTime<Utc>, stale_after: Duration) -> Liveness {
        if self.age(now) > stale_after {
            Liveness::Stale
        } else {
            Liveness::Alive
        }
    }
}

/// Wall-clock jump detector fed by the heartbeat tick.
///
/// Monotonic timers keep ticking through suspend on some platforms and not
/// on others, so the check compares wall-clock progress against the
/// expected tick interval.
#[derive(Debug, Clone)]
pub struct ClockWatch {
    last: DateTime<Utc>,
    tolerance: Duration,
}

impl ClockWatch {
    pub fn new(now: DateTime<Utc>, tolerance: Duration) -> Self {
        Self { last: now, tolerance }
    }

    /// Record a tick; returns the jump when wall time moved more than
    /// `expected + tolerance` forwards, or backwards at all beyond tolerance.
    pub fn observe(&mut self, now: DateTime<Utc>, expected: Duration) -> Option<Duration> {
        let elapsed = now - self.last;
        self.last = now;
        let drift = elapsed - expected;
        (drift > self.tolerance || drift < -self.tolerance).then_some(drift)
    }
}

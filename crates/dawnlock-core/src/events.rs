use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmPhase, FireReason};
use crate::puzzle::{Difficulty, PuzzleKind};
use crate::updater::FeedKind;

/// Every state change in the system produces an Event.
/// The runner prints them; `--json` emits them one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    AlarmFired {
        reason: FireReason,
        /// The schedule or snooze instant this fire answers, if any.
        scheduled_for: Option<DateTime<Utc>>,
        fired_at: DateTime<Utc>,
    },
    /// Fire time passed while the machine was asleep for longer than the
    /// grace window.
    AlarmMissed {
        scheduled_for: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    PuzzlePresented {
        puzzle_id: String,
        kind: PuzzleKind,
        difficulty: Difficulty,
        /// Memorize-then-hide text, shown before `prompt`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reveal: Option<String>,
        prompt: String,
        /// 1-based position within the cycle.
        number: u32,
        required: u32,
        at: DateTime<Utc>,
    },
    AnswerRejected {
        puzzle_id: String,
        puzzles_solved: u32,
        at: DateTime<Utc>,
    },
    AnswerAccepted {
        puzzle_id: String,
        puzzles_solved: u32,
        required: u32,
        at: DateTime<Utc>,
    },
    AlarmSnoozed {
        until: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AlarmDisabled {
        /// Operator override rather than solved puzzles.
        forced: bool,
        at: DateTime<Utc>,
    },
    NextFireScheduled {
        next_fire_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AudioFailed {
        message: String,
        at: DateTime<Utc>,
    },
    SettingsReloaded {
        /// Whether the running cycle keeps its previous settings.
        deferred: bool,
        at: DateTime<Utc>,
    },
    FeedRefreshed {
        kind: FeedKind,
        at: DateTime<Utc>,
    },
    /// Refresh failed; the previous payload stays in place.
    FeedFallback {
        kind: FeedKind,
        reason: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: AlarmPhase,
        puzzles_solved: u32,
        next_fire_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
}

//! Recently shown puzzles, used to avoid repeats.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::kind::{Puzzle, PuzzleKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleHistoryEntry {
    pub puzzle_id: String,
    pub kind: PuzzleKind,
    pub shown_at: DateTime<Utc>,
}

/// How long a shown puzzle counts as "recent", by age and by count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age_days: i64,
    pub max_entries: usize,
}

impl RetentionPolicy {
    /// Oldest `shown_at` still inside the age window. `None` when the window
    /// reaches past the representable range, i.e. nothing ages out.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Duration::try_days(self.max_age_days).and_then(|age| now.checked_sub_signed(age))
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: 7,
            max_entries: 100,
        }
    }
}

/// Append-only log, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleHistory {
    #[serde(default)]
    entries: Vec<PuzzleHistoryEntry>,
}

impl PuzzleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PuzzleHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&PuzzleHistoryEntry> {
        self.entries.last()
    }

    pub fn record(&mut self, puzzle: &Puzzle, shown_at: DateTime<Utc>, policy: &RetentionPolicy) {
        self.entries.push(PuzzleHistoryEntry {
            puzzle_id: puzzle.id.clone(),
            kind: puzzle.kind,
            shown_at,
        });
        self.prune(shown_at, policy);
    }

    /// Drop entries older than the age limit, then the oldest beyond the count
    /// limit.
    pub fn prune(&mut self, now: DateTime<Utc>, policy: &RetentionPolicy) {
        let cutoff = policy.cutoff(now);
        self.entries.retain(|e| cutoff.map_or(true, |c| e.shown_at >= c));
        if self.entries.len() > policy.max_entries {
            let excess = self.entries.len() - policy.max_entries;
            self.entries.drain(..excess);
        }
    }

    /// Whether `puzzle_id` was shown within the retention window.
    pub fn contains_recent(
        &self,
        puzzle_id: &str,
        now: DateTime<Utc>,
        policy: &RetentionPolicy,
    ) -> bool {
        let cutoff = policy.cutoff(now);
        self.entries
            .iter()
            .rev()
            .take(policy.max_entries)
            .any(|e| e.puzzle_id == puzzle_id && cutoff.map_or(true, |c| e.shown_at >= c))
    }
}

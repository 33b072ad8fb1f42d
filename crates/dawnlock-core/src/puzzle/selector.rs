//! Puzzle selection with history-based dedup.
//!
//! Selection runs in three passes, each bounded by the attempt budget:
//!
//! 1. strict: reject anything shown within the retention window
//! 2. relaxed: only reject a repeat of the most recently shown puzzle
//! 3. anything the generators produced during pass 2
//!
//! An alarm must always be dismissible, so only a total failure to generate
//! (every enabled family has an empty bank) surfaces as an error.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::{debug, warn};

use super::history::{PuzzleHistory, RetentionPolicy};
use super::kind::{Difficulty, Puzzle, PuzzleBank, PuzzleKind};
use crate::error::PuzzleGenerationError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone)]
pub struct PuzzleSelector {
    bank: PuzzleBank,
    kinds: Vec<PuzzleKind>,
    retention: RetentionPolicy,
    max_attempts: u32,
    rng: Pcg64,
}

impl PuzzleSelector {
    pub fn new(bank: PuzzleBank, retention: RetentionPolicy) -> Self {
        Self {
            bank,
            kinds: PuzzleKind::ALL.to_vec(),
            retention,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rng: Pcg64::from_entropy(),
        }
    }

    /// Deterministic selection, for tests and reproducible previews.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Pcg64::seed_from_u64(seed);
        self
    }

    /// Restrict the families drawn from. An empty list keeps all of them.
    pub fn with_kinds(mut self, kinds: &[PuzzleKind]) -> Self {
        if !kinds.is_empty() {
            self.kinds = kinds.to_vec();
        }
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Produce a puzzle for `difficulty` and append it to `history`.
    ///
    /// # Errors
    ///
    /// [`PuzzleGenerationError::Exhausted`] only when no candidate at all
    /// could be generated.
    pub fn next(
        &mut self,
        difficulty: Difficulty,
        history: &mut PuzzleHistory,
        now: DateTime<Utc>,
    ) -> Result<Puzzle, PuzzleGenerationError> {
        history.prune(now, &self.retention);
        let mut attempts = 0;

        for _ in 0..self.max_attempts {
            attempts += 1;
            let Some(candidate) = self.candidate(difficulty, now) else {
                continue;
            };
            if history.contains_recent(&candidate.id, now, &self.retention) {
                debug!(puzzle_id = %candidate.id, "rejecting recently shown puzzle");
                continue;
            }
            return Ok(self.accept(candidate, history, now));
        }

        warn!(attempts, "no fresh puzzle found, relaxing dedup");
        let last_shown = history.last().map(|e| e.puzzle_id.clone());
        let mut any = None;
        for _ in 0..self.max_attempts {
            attempts += 1;
            let Some(candidate) = self.candidate(difficulty, now) else {
                continue;
            };
            if last_shown.as_deref() != Some(candidate.id.as_str()) {
                return Ok(self.accept(candidate, history, now));
            }
            any.get_or_insert(candidate);
        }

        match any {
            Some(candidate) => Ok(self.accept(candidate, history, now)),
            None => Err(PuzzleGenerationError::Exhausted { attempts }),
        }
    }

    fn candidate(&mut self, difficulty: Difficulty, now: DateTime<Utc>) -> Option<Puzzle> {
        let kind = self.kinds[self.rng.gen_range(0..self.kinds.len())];
        kind.generate(difficulty, &self.bank, &mut self.rng, now)
    }

    fn accept(&self, puzzle: Puzzle, history: &mut PuzzleHistory, now: DateTime<Utc>) -> Puzzle {
        history.record(&puzzle, now, &self.retention);
        puzzle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::kind::Riddle;

    fn riddle_bank(n: usize) -> PuzzleBank {
        PuzzleBank {
            riddles: (0..n)
                .map(|i| Riddle {
                    question: format!("Riddle {i}?"),
                    answer: format!("answer {i}"),
                })
                .collect(),
            phrases: Vec::new(),
        }
    }

    #[test]
    fn appends_to_history() {
        let mut selector = PuzzleSelector::new(PuzzleBank::default(), RetentionPolicy::default()).with_seed(1);
        let mut history = PuzzleHistory::new();
        let p = selector.next(Difficulty::Easy, &mut history, Utc::now()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.last().unwrap().puzzle_id, p.id);
    }

    #[test]
    fn never_repeats_within_window_when_pool_is_large_enough() {
        // Window of 4, pool of 5: every draw must avoid the previous 4.
        let retention = RetentionPolicy {
            max_age_days: 7,
            max_entries: 4,
        };
        let mut selector = PuzzleSelector::new(riddle_bank(5), retention)
            .with_kinds(&[PuzzleKind::Riddle])
            .with_max_attempts(500)
            .with_seed(42);
        let mut history = PuzzleHistory::new();
        let now = Utc::now();
        let mut shown: Vec<String> = Vec::new();
        for _ in 0..30 {
            let p = selector.next(Difficulty::Easy, &mut history, now).unwrap();
            let window_start = shown.len().saturating_sub(4);
            assert!(!shown[window_start..].contains(&p.id), "{} repeated", p.id);
            shown.push(p.id);
        }
    }

    #[test]
    fn relaxes_instead_of_failing_when_everything_is_recent() {
        let mut selector = PuzzleSelector::new(riddle_bank(2), RetentionPolicy::default())
            .with_kinds(&[PuzzleKind::Riddle])
            .with_seed(9);
        let mut history = PuzzleHistory::new();
        let now = Utc::now();
        let first = selector.next(Difficulty::Easy, &mut history, now).unwrap();
        let second = selector.next(Difficulty::Easy, &mut history, now).unwrap();
        assert_ne!(first.id, second.id);
        // Both riddles are now recent; the third draw still succeeds and
        // avoids the immediately preceding puzzle.
        let third = selector.next(Difficulty::Easy, &mut history, now).unwrap();
        assert_ne!(third.id, second.id);
    }

    #[test]
    fn single_item_pool_repeats_rather_than_failing() {
        let mut selector = PuzzleSelector::new(riddle_bank(1), RetentionPolicy::default())
            .with_kinds(&[PuzzleKind::Riddle])
            .with_seed(5);
        let mut history = PuzzleHistory::new();
        let now = Utc::now();
        let a = selector.next(Difficulty::Easy, &mut history, now).unwrap();
        let b = selector.next(Difficulty::Easy, &mut history, now).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn empty_banks_exhaust() {
        let mut selector = PuzzleSelector::new(PuzzleBank::empty(), RetentionPolicy::default())
            .with_kinds(&[PuzzleKind::Riddle, PuzzleKind::Typing])
            .with_max_attempts(3);
        let mut history = PuzzleHistory::new();
        let err = selector.next(Difficulty::Hard, &mut history, Utc::now()).unwrap_err();
        assert_eq!(err, PuzzleGenerationError::Exhausted { attempts: 6 });
        assert!(history.is_empty());
    }
}

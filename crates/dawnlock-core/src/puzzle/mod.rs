//! Puzzle generation, answer checking and dedup against recent history.

mod history;
mod kind;
mod selector;

pub use history::{PuzzleHistory, PuzzleHistoryEntry, RetentionPolicy};
pub use kind::{Difficulty, Puzzle, PuzzleBank, PuzzleKind, Riddle};
pub use selector::{PuzzleSelector, DEFAULT_MAX_ATTEMPTS};

use chrono::Utc;
use clap::Subcommand;
use dawnlock_core::puzzle::{Difficulty, PuzzleHistory, PuzzleKind};
use dawnlock_core::Config;

use super::CliResult;

#[derive(Subcommand)]
pub enum PuzzleAction {
    /// Print sample puzzles with their answers
    Sample {
        /// math, memory, riddle or typing (default: configured kinds)
        #[arg(long)]
        kind: Option<PuzzleKind>,
        /// easy, medium or hard (default: configured difficulty)
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long, default_value_t = 3)]
        count: u32,
        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

pub fn run(action: PuzzleAction) -> CliResult {
    match action {
        PuzzleAction::Sample {
            kind,
            difficulty,
            count,
            seed,
        } => {
            let config = Config::load()?;
            let mut selector = config.puzzle_selector();
            if let Some(kind) = kind {
                selector = selector.with_kinds(&[kind]);
            }
            if let Some(seed) = seed {
                selector = selector.with_seed(seed);
            }
            let difficulty = difficulty.unwrap_or(config.alarm.puzzle_difficulty);

            // Scratch history: samples must not count as shown.
            let mut history = PuzzleHistory::new();
            for i in 1..=count {
                let puzzle = selector.next(difficulty, &mut history, Utc::now())?;
                println!("#{i} [{} / {}]", puzzle.kind, puzzle.difficulty);
                if let Some(reveal) = &puzzle.reveal {
                    println!("{reveal}");
                }
                println!("{}", puzzle.prompt);
                println!("answer: {}\n", puzzle.expected_answer);
            }
        }
    }
    Ok(())
}

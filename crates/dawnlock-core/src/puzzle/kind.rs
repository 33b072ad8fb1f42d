//! Puzzle families and their answer-checking rules.
//!
//! The set of families is closed: every variant of [`PuzzleKind`] knows how
//! to generate a puzzle for a [`Difficulty`] and how to check an answer.
//!
//! ## Answer normalization
//!
//! - every kind: surrounding whitespace trimmed, case folded, internal
//!   whitespace runs collapsed to one space
//! - math: integer answers compare numerically (`07` == `7`)
//! - memory: only letters and digits count (`1 2-3 4` == `1234`)
//! - riddle: trailing punctuation and one leading article (a/an/the) ignored

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}' (easy, medium, hard)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleKind {
    Math,
    Memory,
    Riddle,
    Typing,
}

impl PuzzleKind {
    pub const ALL: [PuzzleKind; 4] = [
        PuzzleKind::Math,
        PuzzleKind::Memory,
        PuzzleKind::Riddle,
        PuzzleKind::Typing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PuzzleKind::Math => "math",
            PuzzleKind::Memory => "memory",
            PuzzleKind::Riddle => "riddle",
            PuzzleKind::Typing => "typing",
        }
    }

    /// Build one candidate. Riddle and typing puzzles yield `None` when their
    /// bank is empty.
    pub fn generate<R: Rng + ?Sized>(
        self,
        difficulty: Difficulty,
        bank: &PuzzleBank,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Option<Puzzle> {
        let mut reveal = None;
        let (prompt, answer, identity) = match self {
            PuzzleKind::Math => {
                let (prompt, answer) = math_problem(difficulty, rng);
                (prompt.clone(), answer.to_string(), prompt)
            }
            PuzzleKind::Memory => {
                let len = match difficulty {
                    Difficulty::Easy => 4,
                    Difficulty::Medium => 6,
                    Difficulty::Hard => 8,
                };
                let digits: Vec<String> = (0..len).map(|_| rng.gen_range(0..10).to_string()).collect();
                let answer = digits.concat();
                reveal = Some(format!("Memorize: {}", digits.join(" ")));
                ("Enter the sequence you saw:".to_string(), answer.clone(), answer)
            }
            PuzzleKind::Riddle => {
                if bank.riddles.is_empty() {
                    return None;
                }
                let riddle = &bank.riddles[rng.gen_range(0..bank.riddles.len())];
                (riddle.question.clone(), riddle.answer.clone(), riddle.answer.clone())
            }
            PuzzleKind::Typing => {
                if bank.phrases.is_empty() {
                    return None;
                }
                let phrase = &bank.phrases[rng.gen_range(0..bank.phrases.len())];
                (
                    format!("Type this exactly:\n'{phrase}'"),
                    phrase.clone(),
                    phrase.clone(),
                )
            }
        };

        Some(Puzzle {
            id: format!("{}:{}", self.as_str(), identity),
            kind: self,
            difficulty,
            prompt,
            reveal,
            expected_answer: answer,
            generated_at: now,
        })
    }

    /// Compare a submitted answer against the expected one.
    pub fn check(self, expected: &str, submitted: &str) -> bool {
        match self {
            PuzzleKind::Math => match (expected.trim().parse::<i64>(), submitted.trim().parse::<i64>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => normalize(expected) == normalize(submitted),
            },
            PuzzleKind::Memory => alphanumeric(expected) == alphanumeric(submitted),
            PuzzleKind::Riddle => riddle_form(expected) == riddle_form(submitted),
            PuzzleKind::Typing => normalize(expected) == normalize(submitted),
        }
    }
}

impl fmt::Display for PuzzleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PuzzleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PuzzleKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown puzzle kind '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    /// Kind-qualified identity of the content, used for dedup.
    pub id: String,
    pub kind: PuzzleKind,
    pub difficulty: Difficulty,
    /// Shown only while the sequence is being memorized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal: Option<String>,
    pub prompt: String,
    pub expected_answer: String,
    pub generated_at: DateTime<Utc>,
}

impl Puzzle {
    pub fn check_answer(&self, submitted: &str) -> bool {
        self.kind.check(&self.expected_answer, submitted)
    }

    /// Always available, whatever the history or bank holds.
    pub fn fallback(now: DateTime<Utc>) -> Self {
        Self {
            id: "typing:awake".to_string(),
            kind: PuzzleKind::Typing,
            difficulty: Difficulty::Easy,
            reveal: None,
            prompt: "Type this exactly:\n'awake'".to_string(),
            expected_answer: "awake".to_string(),
            generated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Riddle {
    pub question: String,
    pub answer: String,
}

/// Content for the riddle and typing families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleBank {
    pub riddles: Vec<Riddle>,
    pub phrases: Vec<String>,
}

impl PuzzleBank {
    pub fn empty() -> Self {
        Self {
            riddles: Vec::new(),
            phrases: Vec::new(),
        }
    }

    /// Built-in content plus user additions from the config.
    pub fn with_extras(riddles: &[Riddle], phrases: &[String]) -> Self {
        let mut bank = Self::default();
        bank.riddles.extend(riddles.iter().cloned());
        bank.phrases.extend(phrases.iter().cloned());
        bank
    }
}

impl Default for PuzzleBank {
    fn default() -> Self {
        let riddle = |q: &str, a: &str| Riddle {
            question: q.to_string(),
            answer: a.to_string(),
        };
        Self {
            riddles: vec![
                riddle(
                    "I have cities, but no houses; forests, but no trees; and water, but no fish. What am I?",
                    "A map",
                ),
                riddle("What has an eye, but cannot see?", "A needle"),
                riddle("What is always in front of you but can't be seen?", "The future"),
                riddle("What has keys, but opens no locks?", "A piano"),
                riddle("What gets wetter the more it dries?", "A towel"),
                riddle("What has hands but can't clap?", "A clock"),
            ],
            phrases: vec![
                "The quick brown fox jumps over the lazy dog".to_string(),
                "Dawn breaks for those who rise to meet it".to_string(),
                "Solve the puzzle to silence the morning call".to_string(),
                "Coffee first, then conquer the day".to_string(),
            ],
        }
    }
}

fn math_problem<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> (String, i64) {
    match difficulty {
        Difficulty::Easy => {
            let a: i64 = rng.gen_range(1..=10);
            let b: i64 = rng.gen_range(1..=10);
            if rng.gen_bool(0.5) {
                (format!("What is {a} + {b}?"), a + b)
            } else {
                let (hi, lo) = (a.max(b), a.min(b));
                (format!("What is {hi} - {lo}?"), hi - lo)
            }
        }
        Difficulty::Medium => {
            let a: i64 = rng.gen_range(2..=12);
            let b: i64 = rng.gen_range(2..=12);
            match rng.gen_range(0..3) {
                0 => (format!("What is {a} * {b}?"), a * b),
                1 => (format!("What is {} + {}?", a + 5, b + 5), a + b + 10),
                _ => {
                    let (hi, lo) = (a.max(b) * 2, a.min(b));
                    (format!("What is {hi} - {lo}?"), hi - lo)
                }
            }
        }
        Difficulty::Hard => {
            let a: i64 = rng.gen_range(5..=20);
            let b: i64 = rng.gen_range(2..=10);
            let c: i64 = rng.gen_range(2..=10);
            (format!("Solve: ({a} + {b}) * {c}?"), (a + b) * c)
        }
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn alphanumeric(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn riddle_form(s: &str) -> String {
    let lowered = normalize(s);
    let trimmed = lowered.trim_end_matches(|c: char| c.is_ascii_punctuation());
    for article in ["a ", "an ", "the "] {
        if let Some(rest) = trimmed.strip_prefix(article) {
            return rest.to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn evaluate(prompt: &str) -> i64 {
        // "What is 3 + 4?" / "What is 9 * 2?" / "Solve: (5 + 2) * 3?"
        let body = prompt
            .trim_start_matches("What is ")
            .trim_start_matches("Solve: ")
            .trim_end_matches('?');
        if let Some(rest) = body.strip_prefix('(') {
            let (inner, c) = rest.split_once(") * ").unwrap();
            let (a, b) = inner.split_once(" + ").unwrap();
            return (a.parse::<i64>().unwrap() + b.parse::<i64>().unwrap()) * c.parse::<i64>().unwrap();
        }
        let parts: Vec<&str> = body.split(' ').collect();
        let (a, op, b) = (parts[0].parse::<i64>().unwrap(), parts[1], parts[2].parse::<i64>().unwrap());
        match op {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            _ => panic!("unexpected operator {op}"),
        }
    }

    #[test]
    fn math_answers_match_their_prompts() {
        let mut rng = Pcg64::seed_from_u64(7);
        let bank = PuzzleBank::default();
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            for _ in 0..50 {
                let p = PuzzleKind::Math.generate(difficulty, &bank, &mut rng, Utc::now()).unwrap();
                let expected: i64 = p.expected_answer.parse().unwrap();
                assert_eq!(evaluate(&p.prompt), expected, "{}", p.prompt);
                assert!(expected >= 0);
            }
        }
    }

    #[test]
    fn memory_prompt_hides_the_sequence() {
        let mut rng = Pcg64::seed_from_u64(5);
        let puzzle = PuzzleKind::Memory
            .generate(Difficulty::Hard, &PuzzleBank::default(), &mut rng, Utc::now())
            .unwrap();
        let reveal = puzzle.reveal.as_deref().unwrap();

        assert!(!puzzle.prompt.contains(&puzzle.expected_answer));
        assert!(!puzzle.prompt.chars().any(|c| c.is_ascii_digit()));
        let shown: String = reveal.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(shown, puzzle.expected_answer);
        assert!(puzzle.check_answer(&shown));
    }

    #[test]
    fn only_memory_puzzles_have_a_reveal() {
        let mut rng = Pcg64::seed_from_u64(5);
        let bank = PuzzleBank::default();
        for kind in [PuzzleKind::Math, PuzzleKind::Riddle, PuzzleKind::Typing] {
            let puzzle = kind.generate(Difficulty::Medium, &bank, &mut rng, Utc::now()).unwrap();
            assert_eq!(puzzle.reveal, None, "{kind}");
        }
        assert_eq!(Puzzle::fallback(Utc::now()).reveal, None);
    }

    #[test]
    fn memory_length_scales_with_difficulty() {
        let mut rng = Pcg64::seed_from_u64(1);
        let bank = PuzzleBank::default();
        let mut len = |d| {
            PuzzleKind::Memory
                .generate(d, &bank, &mut rng, Utc::now())
                .unwrap()
                .expected_answer
                .len()
        };
        assert_eq!(len(Difficulty::Easy), 4);
        assert_eq!(len(Difficulty::Medium), 6);
        assert_eq!(len(Difficulty::Hard), 8);
    }

    #[test]
    fn empty_bank_yields_nothing_for_text_kinds() {
        let mut rng = Pcg64::seed_from_u64(1);
        let bank = PuzzleBank::empty();
        assert!(PuzzleKind::Riddle.generate(Difficulty::Easy, &bank, &mut rng, Utc::now()).is_none());
        assert!(PuzzleKind::Typing.generate(Difficulty::Easy, &bank, &mut rng, Utc::now()).is_none());
        assert!(PuzzleKind::Math.generate(Difficulty::Easy, &bank, &mut rng, Utc::now()).is_some());
    }

    #[test]
    fn ids_are_kind_qualified() {
        let mut rng = Pcg64::seed_from_u64(3);
        let bank = PuzzleBank::default();
        let p = PuzzleKind::Typing.generate(Difficulty::Hard, &bank, &mut rng, Utc::now()).unwrap();
        assert!(p.id.starts_with("typing:"));
        assert_eq!(p.id, format!("typing:{}", p.expected_answer));
    }

    #[test]
    fn math_check_is_numeric() {
        assert!(PuzzleKind::Math.check("7", " 07 "));
        assert!(!PuzzleKind::Math.check("7", "8"));
        assert!(!PuzzleKind::Math.check("7", "seven"));
    }

    #[test]
    fn memory_check_ignores_separators() {
        assert!(PuzzleKind::Memory.check("4815", "4 8 1 5"));
        assert!(PuzzleKind::Memory.check("4815", "4-8-1-5"));
        assert!(!PuzzleKind::Memory.check("4815", "4851"));
    }

    #[test]
    fn riddle_check_ignores_articles_and_punctuation() {
        assert!(PuzzleKind::Riddle.check("A map", "map"));
        assert!(PuzzleKind::Riddle.check("A map", "  THE   Map! "));
        assert!(PuzzleKind::Riddle.check("The future", "future."));
        assert!(!PuzzleKind::Riddle.check("A map", "a globe"));
    }

    #[test]
    fn typing_check_folds_case_and_whitespace() {
        let expected = "The quick brown fox jumps over the lazy dog";
        assert!(PuzzleKind::Typing.check(expected, "the quick  brown fox jumps over the lazy dog "));
        assert!(!PuzzleKind::Typing.check(expected, "the quick brown fox"));
    }

    #[test]
    fn fallback_accepts_awake() {
        let p = Puzzle::fallback(Utc::now());
        assert!(p.check_answer("Awake"));
        assert!(!p.check_answer("asleep"));
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }
}

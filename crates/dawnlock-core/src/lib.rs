//! # Dawnlock Core Library
//!
//! This library provides the core logic for Dawnlock, a puzzle-gated alarm
//! clock. The alarm fires on a weekly schedule and only goes quiet once the
//! sleeper has solved a configured number of puzzles; afterwards a morning
//! dashboard shows reminders, cached weather and news, and a countdown to the
//! day's events. The `dawnlock` CLI drives everything from this crate.
//!
//! ## Architecture
//!
//! - **Alarm Engine**: A wall-clock-based state machine; the caller passes
//!   `now` into every operation and acts on the returned events
//! - **Schedule**: Weekly wake times and events, next-fire and countdown
//!   evaluation
//! - **Puzzles**: Generators per puzzle family with history-based dedup
//! - **Cache**: One atomic JSON file per record
//! - **Updater**: Weather/news refresh with stale-cache fallback
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`AlarmEngine`]: Core alarm state machine
//! - [`PuzzleSelector`]: Puzzle selection with dedup
//! - [`CacheStore`]: Record persistence
//! - [`UpdaterCoordinator`]: Feed refresh and back-off
//! - [`Config`]: Application configuration management

pub mod alarm;
pub mod cache;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod puzzle;
pub mod schedule;
pub mod storage;
pub mod updater;

pub use alarm::{AlarmEngine, AlarmLedger, AlarmPhase, AlarmSettings, AlarmState, AudioPlayer};
pub use cache::{CacheRecord, CacheSource, CacheStore, RecordName};
pub use dashboard::Dashboard;
pub use error::{AudioError, ConfigError, CoreError, FetchError, PersistenceError, PuzzleGenerationError, ScheduleError};
pub use events::Event;
pub use heartbeat::Heartbeat;
pub use puzzle::{Difficulty, Puzzle, PuzzleHistory, PuzzleKind, PuzzleSelector};
pub use schedule::{next_fire_time, DaySchedule, WeeklySchedule};
pub use storage::Config;
pub use updater::{FeedKind, HttpFetcher, UpdaterCoordinator, UpdaterPolicy};

//! TOML-based application configuration.
//!
//! Stores:
//! - Alarm settings (sound, puzzle count and difficulty, snooze)
//! - Puzzle history retention and extra riddles/phrases
//! - Weather/news endpoints and refresh cadence
//! - The external audio player command
//! - The weekly wake-up schedule
//!
//! Configuration is stored at `~/.config/dawnlock/config.toml`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::data_dir;
use crate::alarm::AlarmSettings;
use crate::error::ConfigError;
use crate::puzzle::{
    Difficulty, PuzzleBank, PuzzleKind, PuzzleSelector, RetentionPolicy, Riddle, DEFAULT_MAX_ATTEMPTS,
};
use crate::schedule::WeeklySchedule;
use crate::updater::{FeedKind, UpdaterPolicy};

/// Upper bound on puzzles per alarm.
pub const MAX_PUZZLES_REQUIRED: u32 = 10;

/// Upper bound on the puzzle history age window, ten years.
pub const MAX_HISTORY_DAYS: i64 = 3650;

/// File extensions `available_sounds` lists.
const SOUND_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// File name (looked up in `audio.sounds_dir`) or absolute path.
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default = "default_puzzles_required")]
    pub puzzles_required: u32,
    #[serde(default)]
    pub puzzle_difficulty: Difficulty,
    #[serde(default = "default_true")]
    pub check_internet: bool,
    /// Snooze is only offered when set.
    #[serde(default)]
    pub snooze_minutes: Option<u32>,
    /// How late a fire may still happen after a suspend.
    #[serde(default = "default_grace")]
    pub missed_alarm_grace_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default = "default_history_days")]
    pub history_days: i64,
    #[serde(default = "default_history_max_entries")]
    pub history_max_entries: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_kinds")]
    pub kinds: Vec<PuzzleKind>,
    #[serde(default)]
    pub extra_riddles: Vec<Riddle>,
    #[serde(default)]
    pub extra_phrases: Vec<String>,
    /// How long a memory sequence stays on screen before it is hidden.
    #[serde(default = "default_memory_reveal_secs")]
    pub memory_reveal_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default = "default_cadence")]
    pub cadence_minutes: u32,
    /// weatherapi.com-style `current.json` endpoint, key included.
    #[serde(default)]
    pub weather_url: Option<String>,
    /// newsapi.org-style `top-headlines` endpoint, key included.
    #[serde(default)]
    pub news_url: Option<String>,
    #[serde(default = "default_weather_stale")]
    pub weather_stale_minutes: u32,
    #[serde(default = "default_news_stale")]
    pub news_stale_minutes: u32,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// How long before a fire the opportunistic refresh runs.
    #[serde(default = "default_prefetch_lead")]
    pub prefetch_lead_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Player argv; `{sound}` is replaced with the sound path. Empty = silent.
    #[serde(default = "default_player_command")]
    pub command: Vec<String>,
    #[serde(default)]
    pub sounds_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,
    /// `dawnlock status` reports dead past this age.
    #[serde(default = "default_heartbeat_stale")]
    pub heartbeat_stale_secs: u64,
    /// A wall-clock jump larger than this between heartbeats counts as a
    /// suspend/resume.
    #[serde(default = "default_suspend_jump")]
    pub suspend_jump_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dawnlock/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub puzzles: PuzzleConfig,
    #[serde(default)]
    pub updater: UpdaterConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default = "WeeklySchedule::default_routine")]
    pub schedule: WeeklySchedule,
}

// Default functions
fn default_sound() -> String {
    "rooster.mp3".into()
}
fn default_puzzles_required() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_grace() -> u32 {
    30
}
fn default_history_days() -> i64 {
    7
}
fn default_history_max_entries() -> usize {
    100
}
fn default_memory_reveal_secs() -> u64 {
    4
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_kinds() -> Vec<PuzzleKind> {
    PuzzleKind::ALL.to_vec()
}
fn default_cadence() -> u32 {
    360
}
fn default_weather_stale() -> u32 {
    180
}
fn default_news_stale() -> u32 {
    360
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_prefetch_lead() -> u32 {
    15
}
fn default_player_command() -> Vec<String> {
    ["mpv", "--no-video", "--really-quiet", "--loop=inf", "{sound}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_heartbeat() -> u64 {
    15
}
fn default_heartbeat_stale() -> u64 {
    90
}
fn default_suspend_jump() -> u64 {
    120
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            sound: default_sound(),
            puzzles_required: default_puzzles_required(),
            puzzle_difficulty: Difficulty::Easy,
            check_internet: true,
            snooze_minutes: None,
            missed_alarm_grace_minutes: default_grace(),
        }
    }
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            history_days: default_history_days(),
            history_max_entries: default_history_max_entries(),
            max_attempts: default_max_attempts(),
            kinds: default_kinds(),
            extra_riddles: Vec::new(),
            extra_phrases: Vec::new(),
            memory_reveal_secs: default_memory_reveal_secs(),
        }
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            cadence_minutes: default_cadence(),
            weather_url: None,
            news_url: None,
            weather_stale_minutes: default_weather_stale(),
            news_stale_minutes: default_news_stale(),
            fetch_timeout_secs: default_fetch_timeout(),
            prefetch_lead_minutes: default_prefetch_lead(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            sounds_dir: None,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat(),
            heartbeat_stale_secs: default_heartbeat_stale(),
            suspend_jump_secs: default_suspend_jump(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alarm: AlarmConfig::default(),
            puzzles: PuzzleConfig::default(),
            updater: UpdaterConfig::default(),
            audio: AudioConfig::default(),
            daemon: DaemonConfig::default(),
            schedule: WeeklySchedule::default_routine(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = if value.eq_ignore_ascii_case("none") {
                    serde_json::Value::Null
                } else {
                    match existing {
                        serde_json::Value::Bool(_) => serde_json::Value::Bool(
                            value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                        ),
                        serde_json::Value::Number(_) => {
                            if let Ok(n) = value.parse::<i64>() {
                                serde_json::Value::Number(n.into())
                            } else if let Ok(n) = value.parse::<f64>() {
                                serde_json::Number::from_f64(n)
                                    .map(serde_json::Value::Number)
                                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                            } else {
                                return Err(invalid(format!("cannot parse '{value}' as number")));
                            }
                        }
                        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                            serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                        }
                        // Unset optional: take JSON if it parses, else a plain string.
                        serde_json::Value::Null => serde_json::from_str(value)
                            .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                        _ => serde_json::Value::String(value.into()),
                    }
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default path, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        if !(1..=MAX_PUZZLES_REQUIRED).contains(&self.alarm.puzzles_required) {
            return Err(invalid(
                "alarm.puzzles_required",
                format!("must be between 1 and {MAX_PUZZLES_REQUIRED}"),
            ));
        }
        if self.alarm.snooze_minutes == Some(0) {
            return Err(invalid("alarm.snooze_minutes", "must be at least 1".into()));
        }
        if !(0..=MAX_HISTORY_DAYS).contains(&self.puzzles.history_days) {
            return Err(invalid(
                "puzzles.history_days",
                format!("must be between 0 and {MAX_HISTORY_DAYS}"),
            ));
        }
        if !(1..=60).contains(&self.puzzles.memory_reveal_secs) {
            return Err(invalid(
                "puzzles.memory_reveal_secs",
                "must be between 1 and 60".into(),
            ));
        }
        if self.updater.cadence_minutes == 0 {
            return Err(invalid("updater.cadence_minutes", "must be at least 1".into()));
        }
        if self.daemon.heartbeat_secs == 0 {
            return Err(invalid("daemon.heartbeat_secs", "must be at least 1".into()));
        }
        for (key, url) in [
            ("updater.weather_url", &self.updater.weather_url),
            ("updater.news_url", &self.updater.news_url),
        ] {
            if let Some(url) = url {
                url::Url::parse(url).map_err(|e| invalid(key, e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// into the field's type, or the result fails validation. `self` is left
    /// untouched on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save to the default path.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Immutable snapshot handed to the alarm engine.
    pub fn alarm_settings(&self) -> AlarmSettings {
        AlarmSettings {
            sound_reference: self.sound_path().display().to_string(),
            puzzles_required: self.alarm.puzzles_required.max(1),
            puzzle_difficulty: self.alarm.puzzle_difficulty,
            check_internet: self.alarm.check_internet,
            snooze_minutes: self.alarm.snooze_minutes,
            missed_alarm_grace_minutes: self.alarm.missed_alarm_grace_minutes,
        }
    }

    pub fn weekly_schedule(&self) -> WeeklySchedule {
        self.schedule.clone()
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age_days: self.puzzles.history_days,
            max_entries: self.puzzles.history_max_entries.max(1),
        }
    }

    pub fn puzzle_bank(&self) -> PuzzleBank {
        PuzzleBank::with_extras(&self.puzzles.extra_riddles, &self.puzzles.extra_phrases)
    }

    pub fn puzzle_selector(&self) -> PuzzleSelector {
        PuzzleSelector::new(self.puzzle_bank(), self.retention())
            .with_kinds(&self.puzzles.kinds)
            .with_max_attempts(self.puzzles.max_attempts)
    }

    pub fn updater_policy(&self) -> UpdaterPolicy {
        UpdaterPolicy {
            cadence: Duration::minutes(i64::from(self.updater.cadence_minutes)),
            weather_stale_after: Duration::minutes(i64::from(self.updater.weather_stale_minutes)),
            news_stale_after: Duration::minutes(i64::from(self.updater.news_stale_minutes)),
            fetch_timeout: std::time::Duration::from_secs(self.updater.fetch_timeout_secs.max(1)),
            check_internet: self.alarm.check_internet,
        }
    }

    pub fn feed_url(&self, kind: FeedKind) -> Option<&str> {
        match kind {
            FeedKind::Weather => self.updater.weather_url.as_deref(),
            FeedKind::News => self.updater.news_url.as_deref(),
        }
    }

    /// Resolve `alarm.sound` against `audio.sounds_dir`.
    pub fn sound_path(&self) -> PathBuf {
        let sound = Path::new(&self.alarm.sound);
        match &self.audio.sounds_dir {
            Some(dir) if sound.is_relative() => dir.join(sound),
            _ => sound.to_path_buf(),
        }
    }

    /// Audio files (`.mp3`, `.wav`, `.ogg`) in the directory relative sounds
    /// resolve against, sorted by name. A missing directory lists nothing.
    pub fn available_sounds(&self) -> Result<Vec<String>, ConfigError> {
        let dir = self
            .audio
            .sounds_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %dir.display(), "sounds directory not found");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: dir,
                    message: e.to_string(),
                })
            }
        };

        let mut sounds: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| SOUND_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        sounds.sort();
        Ok(sounds)
    }
}

//! Core error types for dawnlock-core.
//!
//! Each component owns one error enum. Only [`ScheduleError`] is allowed to
//! halt the process; the others are absorbed at their component boundary and
//! downgraded to degraded-but-functional behaviour.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dawnlock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Schedule evaluation errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cache record persistence errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Weather/news fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Puzzle generation errors
    #[error("Puzzle error: {0}")]
    Puzzle(#[from] PuzzleGenerationError),

    /// Audio playback errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Nothing can be scheduled. Fatal to the scheduling loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no wake time is configured for any day of the week")]
    NoAlarmConfigured,

    #[error("invalid time of day '{value}' (expected HH:MM or HH:MM:SS)")]
    InvalidTime { value: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home/data directory unavailable
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// A cache record could not be read or written.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record {path} is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Weather or news could not be fetched. Degrades to the stale cache.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no endpoint configured for {0}")]
    NotConfigured(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("fetch timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// No candidate puzzle could be produced at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PuzzleGenerationError {
    #[error("no puzzle could be generated after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Audio playback failure.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no player command configured")]
    NoCommand,

    #[error("failed to spawn player '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn first_schedule_step(fail: bool) -> Result<u32> {
        if fail {
            Err(ScheduleError::NoAlarmConfigured)?;
        }
        Ok(1)
    }

    #[test]
    fn component_errors_convert_into_core_error() {
        let err = first_schedule_step(true).unwrap_err();
        assert!(matches!(err, CoreError::Schedule(ScheduleError::NoAlarmConfigured)));
        assert_eq!(
            err.to_string(),
            "Schedule error: no wake time is configured for any day of the week"
        );
        assert_eq!(first_schedule_step(false).unwrap(), 1);

        let err: CoreError = PuzzleGenerationError::Exhausted { attempts: 3 }.into();
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn invalid_time_names_the_value() {
        let err = ScheduleError::InvalidTime {
            value: "25:99".into(),
        };
        assert!(err.to_string().contains("'25:99'"));
    }
}

//! File-backed record store.
//!
//! One human-readable JSON file per record under a single directory. Writes
//! go to a temporary sibling and are renamed over the target, so a reader
//! sees either the previous or the new record, never a partial one.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::payload::{Reminder, Reminders};
use super::record::{CacheRecord, RecordName};
use crate::error::{ConfigError, PersistenceError};
use crate::storage::data_dir;

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data_dir>/cache`.
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::new(data_dir()?.join("cache")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: RecordName) -> PathBuf {
        self.dir.join(name.file_name())
    }

    /// `Ok(None)` when the record has never been written.
    pub fn load<T: DeserializeOwned>(&self, name: RecordName) -> Result<Option<T>, PersistenceError> {
        let path = self.path(name);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Read { path, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| PersistenceError::Decode { path, source })
    }

    pub fn save<T: Serialize>(&self, name: RecordName, value: &T) -> Result<(), PersistenceError> {
        let path = self.path(name);
        let text = serde_json::to_string_pretty(value).map_err(PersistenceError::Encode)?;

        std::fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let tmp_path = self
            .dir
            .join(format!(".{}.{}.tmp", name.file_name(), std::process::id()));
        std::fs::write(&tmp_path, text).map_err(|source| PersistenceError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp_path);
            PersistenceError::Write {
                path: path.clone(),
                source,
            }
        })?;
        debug!(record = %name, "record saved");
        Ok(())
    }

    pub fn load_record<T: DeserializeOwned>(
        &self,
        name: RecordName,
    ) -> Result<Option<CacheRecord<T>>, PersistenceError> {
        self.load(name)
    }

    pub fn save_record<T: Serialize>(
        &self,
        name: RecordName,
        record: &CacheRecord<T>,
    ) -> Result<(), PersistenceError> {
        self.save(name, record)
    }

    pub fn reminders(&self) -> Result<Option<CacheRecord<Reminders>>, PersistenceError> {
        self.load_record(RecordName::Reminders)
    }

    /// Append a reminder and bump the record's `updated_at`.
    pub fn append_reminder(
        &self,
        reminder: Reminder,
        now: DateTime<Utc>,
    ) -> Result<CacheRecord<Reminders>, PersistenceError> {
        let mut reminders = self.reminders()?.map(|r| r.payload).unwrap_or_default();
        reminders.items.push(reminder);
        let record = CacheRecord::live(reminders, now);
        self.save_record(RecordName::Reminders, &record)?;
        Ok(record)
    }

    pub fn clear_reminders(&self, now: DateTime<Utc>) -> Result<(), PersistenceError> {
        self.save_record(RecordName::Reminders, &CacheRecord::live(Reminders::default(), now))
    }
}

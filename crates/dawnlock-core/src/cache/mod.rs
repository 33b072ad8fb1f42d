//! Durable records backing the dashboard and the engine's restart state.

mod payload;
mod record;
mod store;

pub use payload::{NewsDigest, Reminder, ReminderKind, Reminders, WeatherReport};
pub use record::{CacheRecord, CacheSource, RecordName};
pub use store::CacheStore;

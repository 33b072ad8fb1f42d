mod audio;
mod engine;
mod ledger;

pub use audio::{player_for, AudioPlayer, CommandPlayer, SilentPlayer, SOUND_PLACEHOLDER};
pub use engine::{AlarmEngine, AlarmPhase, AlarmSettings, AlarmState, FireReason};
pub use ledger::AlarmLedger;

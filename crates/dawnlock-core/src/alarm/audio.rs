//! Delegated alarm audio.
//!
//! The engine only ever calls `play`/`stop` synchronously in transition
//! order; the player owns whatever process or device does the actual sound.

use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

use crate::error::AudioError;

/// Placeholder in a player command replaced by the sound path.
pub const SOUND_PLACEHOLDER: &str = "{sound}";

pub trait AudioPlayer: Send {
    /// Start looping `sound`. Restarts playback if already playing.
    fn play(&mut self, sound: &str) -> Result<(), AudioError>;

    /// Stop playback. Calling it while nothing plays is a no-op.
    fn stop(&mut self);

    fn is_playing(&mut self) -> bool;
}

/// Spawns an external player (`mpv`, `paplay`, `afplay`...) and kills it on
/// stop.
#[derive(Debug)]
pub struct CommandPlayer {
    command: Vec<String>,
    child: Option<Child>,
}

impl CommandPlayer {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            child: None,
        }
    }

    /// Program and arguments for `sound`. The sound is appended when the
    /// command has no placeholder.
    pub fn argv(&self, sound: &str) -> Option<(String, Vec<String>)> {
        let (program, rest) = self.command.split_first()?;
        let mut args: Vec<String> = rest
            .iter()
            .map(|arg| arg.replace(SOUND_PLACEHOLDER, sound))
            .collect();
        if !self.command.iter().any(|arg| arg.contains(SOUND_PLACEHOLDER)) {
            args.push(sound.to_string());
        }
        Some((program.clone(), args))
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&mut self, sound: &str) -> Result<(), AudioError> {
        self.stop();
        let (program, args) = self.argv(sound).ok_or(AudioError::NoCommand)?;
        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| AudioError::Spawn {
                program: program.clone(),
                source,
            })?;
        info!(%program, pid = child.id(), "alarm audio started");
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill() {
            // Already exited on its own.
            debug!(error = %e, "player kill failed");
        }
        if let Err(e) = child.wait() {
            warn!(error = %e, "failed to reap player process");
        }
        info!("alarm audio stopped");
    }

    fn is_playing(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_))) | Some(Err(_)) => {
                self.child = None;
                false
            }
            None => false,
        }
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Logs instead of playing. Used when no player command is configured.
#[derive(Debug, Default)]
pub struct SilentPlayer {
    playing: bool,
}

impl AudioPlayer for SilentPlayer {
    fn play(&mut self, sound: &str) -> Result<(), AudioError> {
        info!(sound, "alarm audio (silent)");
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&mut self) -> bool {
        self.playing
    }
}

/// `CommandPlayer` for a non-empty command, `SilentPlayer` otherwise.
pub fn player_for(command: &[String]) -> Box<dyn AudioPlayer> {
    if command.is_empty() {
        Box::new(SilentPlayer::default())
    } else {
        Box::new(CommandPlayer::new(command.to_vec()))
    }
}

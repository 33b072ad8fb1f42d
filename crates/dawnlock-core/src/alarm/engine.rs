//! Alarm engine implementation.
//!
//! The alarm engine is a wall-clock-based state machine. It does not use
//! internal threads or timers: the caller passes `now` into every operation
//! and is responsible for calling `poll()` when `next_fire_at` is reached.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Ringing -> PuzzleActive -> Disabled -> Idle
//!                         |  ^
//!                         +--+  (wrong answer / next puzzle)
//! Ringing | PuzzleActive -> Snoozed -> Idle      (when snooze is enabled)
//! ```
//!
//! `Ringing`, `Disabled` and `Snoozed` are pass-through phases: the engine
//! never rests in them between calls, but each is reported in events.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = AlarmEngine::new(Local, settings, schedule, selector, audio, Utc::now())?;
//! // In a loop:
//! for event in engine.poll(Utc::now()) { ... }
//! engine.submit_answer("42", Utc::now());
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::audio::AudioPlayer;
use super::ledger::AlarmLedger;
use crate::error::ScheduleError;
use crate::events::Event;
use crate::puzzle::{Difficulty, Puzzle, PuzzleHistory, PuzzleSelector};
use crate::schedule::{next_fire_time, WeeklySchedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlarmPhase {
    Idle,
    Ringing,
    PuzzleActive,
    Snoozed,
    Disabled,
}

impl AlarmPhase {
    /// Audio is playing and puzzles gate the way out.
    pub fn is_active(self) -> bool {
        matches!(self, AlarmPhase::Ringing | AlarmPhase::PuzzleActive)
    }
}

/// Why a cycle started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FireReason {
    Scheduled,
    Snooze,
    Debug,
    /// Picked up from the ledger after a restart.
    Resumed,
}

/// Immutable settings snapshot. A running cycle keeps the snapshot it
/// started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSettings {
    pub sound_reference: String,
    pub puzzles_required: u32,
    pub puzzle_difficulty: Difficulty,
    pub check_internet: bool,
    pub snooze_minutes: Option<u32>,
    pub missed_alarm_grace_minutes: u32,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            sound_reference: "rooster.mp3".into(),
            puzzles_required: 3,
            puzzle_difficulty: Difficulty::Easy,
            check_internet: true,
            snooze_minutes: None,
            missed_alarm_grace_minutes: 30,
        }
    }
}

impl AlarmSettings {
    pub fn missed_alarm_grace(&self) -> Duration {
        Duration::minutes(i64::from(self.missed_alarm_grace_minutes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    pub phase: AlarmPhase,
    pub puzzles_solved: u32,
    pub current_puzzle: Option<Puzzle>,
    pub fired_at: Option<DateTime<Utc>>,
    pub next_fire_at: DateTime<Utc>,
    /// `next_fire_at` is a snooze re-ring rather than a schedule slot.
    #[serde(default)]
    pub snoozed: bool,
}

/// Core alarm state machine.
///
/// Schedule lookups happen in `Tz`; every instant the engine stores or
/// reports is UTC.
pub struct AlarmEngine<Tz: TimeZone> {
    tz: Tz,
    schedule: WeeklySchedule,
    /// Applied to the next cycle.
    settings: AlarmSettings,
    /// Snapshot of the running cycle.
    cycle_settings: Option<AlarmSettings>,
    state: AlarmState,
    selector: PuzzleSelector,
    history: PuzzleHistory,
    ledger: AlarmLedger,
    audio: Box<dyn AudioPlayer>,
}

impl<Tz: TimeZone> AlarmEngine<Tz> {
    /// Create an idle engine armed for the next scheduled wake time.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::NoAlarmConfigured`] when the schedule has no wake
    /// time on any day.
    pub fn new(
        tz: Tz,
        settings: AlarmSettings,
        schedule: WeeklySchedule,
        selector: PuzzleSelector,
        audio: Box<dyn AudioPlayer>,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let next_fire_at = compute_next_fire(&tz, &schedule, now, None)?;
        info!(%next_fire_at, "alarm armed");
        Ok(Self {
            tz,
            schedule,
            settings,
            cycle_settings: None,
            state: AlarmState {
                phase: AlarmPhase::Idle,
                puzzles_solved: 0,
                current_puzzle: None,
                fired_at: None,
                next_fire_at,
                snoozed: false,
            },
            selector,
            history: PuzzleHistory::new(),
            ledger: AlarmLedger::default(),
            audio,
        })
    }

    /// Seed the dedup history, typically from the persisted record.
    pub fn with_history(mut self, history: PuzzleHistory) -> Self {
        self.history = history;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &AlarmState {
        &self.state
    }

    pub fn phase(&self) -> AlarmPhase {
        self.state.phase
    }

    pub fn next_fire_at(&self) -> DateTime<Utc> {
        self.state.next_fire_at
    }

    pub fn next_fire_local(&self) -> DateTime<Tz> {
        self.state.next_fire_at.with_timezone(&self.tz)
    }

    pub fn current_puzzle(&self) -> Option<&Puzzle> {
        self.state.current_puzzle.as_ref()
    }

    /// Settings of the running cycle, or the ones the next cycle will use.
    pub fn settings(&self) -> &AlarmSettings {
        self.cycle_settings.as_ref().unwrap_or(&self.settings)
    }

    pub fn schedule(&self) -> &WeeklySchedule {
        &self.schedule
    }

    pub fn history(&self) -> &PuzzleHistory {
        &self.history
    }

    pub fn ledger(&self) -> &AlarmLedger {
        &self.ledger
    }

    pub fn is_playing(&mut self) -> bool {
        self.audio.is_playing()
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase,
            puzzles_solved: self.state.puzzles_solved,
            next_fire_at: self.state.next_fire_at,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Fire when `next_fire_at` has been reached.
    ///
    /// A fire time that slipped by more than the grace window (the machine
    /// was suspended) is reported as missed and the next slot is armed
    /// instead.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state.phase != AlarmPhase::Idle || now < self.state.next_fire_at {
            return Vec::new();
        }

        let scheduled_for = self.state.next_fire_at;
        let reason = if self.state.snoozed {
            FireReason::Snooze
        } else {
            FireReason::Scheduled
        };

        if now - scheduled_for <= self.settings.missed_alarm_grace() {
            return self.ring(now, now, Some(scheduled_for), reason);
        }

        warn!(%scheduled_for, %now, "alarm missed, outside grace window");
        self.state.snoozed = false;
        self.ledger.snoozed_until = None;
        let mut events = vec![Event::AlarmMissed { scheduled_for, at: now }];
        events.extend(self.rearm(now, Some(scheduled_for), now));
        events
    }

    /// Ring immediately without touching the schedule. Ignored while a
    /// cycle is already running.
    pub fn debug_trigger(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state.phase.is_active() {
            debug!("debug trigger ignored, alarm already ringing");
            return Vec::new();
        }
        self.ring(now, now, None, FireReason::Debug)
    }

    /// Check `answer` against the current puzzle.
    ///
    /// A wrong answer keeps the same puzzle on screen.
    pub fn submit_answer(&mut self, answer: &str, now: DateTime<Utc>) -> Vec<Event> {
        if self.state.phase != AlarmPhase::PuzzleActive {
            debug!("answer ignored, no puzzle active");
            return Vec::new();
        }
        let Some(puzzle) = self.state.current_puzzle.as_ref() else {
            return Vec::new();
        };
        let puzzle_id = puzzle.id.clone();

        if !puzzle.check_answer(answer) {
            info!(%puzzle_id, "wrong answer");
            return vec![Event::AnswerRejected {
                puzzle_id,
                puzzles_solved: self.state.puzzles_solved,
                at: now,
            }];
        }

        let required = self.settings().puzzles_required.max(1);
        self.state.puzzles_solved += 1;
        info!(%puzzle_id, solved = self.state.puzzles_solved, required, "puzzle solved");
        let mut events = vec![Event::AnswerAccepted {
            puzzle_id,
            puzzles_solved: self.state.puzzles_solved,
            required,
            at: now,
        }];

        if self.state.puzzles_solved >= required {
            events.extend(self.disable(now, false));
        } else {
            events.extend(self.present_puzzle(now));
        }
        events
    }

    /// Silence the running cycle and re-ring after `snooze_minutes`.
    /// Ignored unless snooze is enabled for this cycle.
    pub fn snooze(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.state.phase.is_active() {
            return Vec::new();
        }
        let Some(minutes) = self.settings().snooze_minutes else {
            debug!("snooze requested but not enabled");
            return Vec::new();
        };

        let until = now + Duration::minutes(i64::from(minutes.max(1)));
        self.audio.stop();
        self.state.phase = AlarmPhase::Snoozed;
        self.state.current_puzzle = None;
        self.state.puzzles_solved = 0;
        self.ledger.snoozed_until = Some(until);
        info!(%until, "alarm snoozed");

        self.state.phase = AlarmPhase::Idle;
        self.state.next_fire_at = until;
        self.state.snoozed = true;
        self.cycle_settings = None;
        vec![
            Event::AlarmSnoozed { until, at: now },
            Event::NextFireScheduled {
                next_fire_at: until,
                at: now,
            },
        ]
    }

    /// Operator override: end the running cycle (or a pending snooze)
    /// without puzzles.
    pub fn disable_now(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state.phase.is_active() || self.state.snoozed {
            warn!("alarm disabled by override");
            self.disable(now, true)
        } else {
            Vec::new()
        }
    }

    /// Take new settings and schedule.
    ///
    /// A running cycle keeps its snapshot; the new values apply from the
    /// next `next_fire_at` computation on. A pending snooze is kept.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::NoAlarmConfigured`] for an empty schedule, in which
    /// case nothing is changed.
    pub fn reload(
        &mut self,
        settings: AlarmSettings,
        schedule: WeeklySchedule,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, ScheduleError> {
        if !schedule.has_any_alarm() {
            return Err(ScheduleError::NoAlarmConfigured);
        }
        self.settings = settings;
        self.schedule = schedule;

        let deferred = self.state.phase.is_active();
        info!(deferred, "settings reloaded");
        let mut events = vec![Event::SettingsReloaded { deferred, at: now }];
        if self.state.phase == AlarmPhase::Idle && !self.state.snoozed {
            events.extend(self.rearm(now, self.state.fired_at, now));
        }
        Ok(events)
    }

    /// Re-evaluate after a suspend or clock jump.
    ///
    /// A fire time that fell inside the jump is handled by `poll` first, so
    /// it either rings (inside grace) or is reported missed.
    pub fn resync(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = self.poll(now);
        if self.state.phase == AlarmPhase::Idle && !self.state.snoozed && events.is_empty() {
            let previous = self.state.next_fire_at;
            let rearmed = self.rearm(now, self.state.fired_at, now);
            if self.state.next_fire_at != previous {
                events.extend(rearmed);
            }
        }
        events
    }

    /// Pick up where a previous process left off.
    ///
    /// A fire with no later disable that is still within the grace window
    /// rings again; a pending snooze is re-armed; anything else arms the
    /// next slot after the last fire.
    pub fn restore(&mut self, ledger: AlarmLedger, now: DateTime<Utc>) -> Vec<Event> {
        self.ledger = ledger;
        self.state.fired_at = self.ledger.last_fired_at;
        let grace = self.settings.missed_alarm_grace();

        if let Some(until) = self.ledger.snoozed_until {
            if self.ledger.unfinished_fire().is_some() {
                self.state.snoozed = true;
                self.state.next_fire_at = until;
                info!(%until, "restored pending snooze");
                // Fires now, later, or is reported missed.
                let mut events = vec![Event::NextFireScheduled {
                    next_fire_at: until,
                    at: now,
                }];
                events.extend(self.poll(now));
                return events;
            }
            self.ledger.snoozed_until = None;
        }

        if let Some(fired_at) = self.ledger.unfinished_fire() {
            if now - fired_at <= grace {
                info!(%fired_at, "resuming interrupted alarm");
                return self.ring(now, fired_at, Some(fired_at), FireReason::Resumed);
            }
            warn!(%fired_at, "interrupted alarm is past the grace window");
        }

        self.rearm(now, self.ledger.last_fired_at, now)
    }

    /// Stop audio and drop the puzzle. Used on shutdown.
    pub fn shutdown(&mut self) {
        self.audio.stop();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ring(
        &mut self,
        now: DateTime<Utc>,
        fired_at: DateTime<Utc>,
        scheduled_for: Option<DateTime<Utc>>,
        reason: FireReason,
    ) -> Vec<Event> {
        let settings = self.settings.clone();
        self.state.phase = AlarmPhase::Ringing;
        self.state.fired_at = Some(fired_at);
        self.state.puzzles_solved = 0;
        self.state.snoozed = false;
        self.ledger.last_fired_at = Some(fired_at);
        self.ledger.snoozed_until = None;
        info!(?reason, %fired_at, "alarm ringing");

        let mut events = vec![Event::AlarmFired {
            reason,
            scheduled_for,
            fired_at,
        }];

        if let Err(e) = self.audio.play(&settings.sound_reference) {
            warn!(error = %e, "alarm audio failed, continuing without sound");
            events.push(Event::AudioFailed {
                message: e.to_string(),
                at: now,
            });
        }
        self.cycle_settings = Some(settings);

        events.extend(self.present_puzzle(now));
        events
    }

    fn present_puzzle(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let settings = self.settings().clone();
        let puzzle = match self
            .selector
            .next(settings.puzzle_difficulty, &mut self.history, now)
        {
            Ok(puzzle) => puzzle,
            Err(e) => {
                warn!(error = %e, "puzzle generation failed, using fallback");
                Puzzle::fallback(now)
            }
        };

        let event = Event::PuzzlePresented {
            puzzle_id: puzzle.id.clone(),
            kind: puzzle.kind,
            difficulty: puzzle.difficulty,
            reveal: puzzle.reveal.clone(),
            prompt: puzzle.prompt.clone(),
            number: self.state.puzzles_solved + 1,
            required: settings.puzzles_required.max(1),
            at: now,
        };
        self.state.current_puzzle = Some(puzzle);
        self.state.phase = AlarmPhase::PuzzleActive;
        vec![event]
    }

    fn disable(&mut self, now: DateTime<Utc>, forced: bool) -> Vec<Event> {
        self.audio.stop();
        self.state.phase = AlarmPhase::Disabled;
        self.state.current_puzzle = None;
        self.state.snoozed = false;
        self.ledger.last_disabled_at = Some(now);
        self.ledger.snoozed_until = None;
        info!(forced, "alarm disabled");

        let mut events = vec![Event::AlarmDisabled { forced, at: now }];

        // Disabled -> Idle. Scan from the fire time so a slot that came due
        // during a long (or debug) cycle still rings or is reported missed.
        let fired_at = self.state.fired_at;
        let from = fired_at.unwrap_or(now);
        self.state.phase = AlarmPhase::Idle;
        self.state.puzzles_solved = 0;
        self.cycle_settings = None;
        events.extend(self.rearm(from, fired_at, now));
        events
    }

    /// Point `next_fire_at` at the first schedule slot from `from`.
    fn rearm(
        &mut self,
        from: DateTime<Utc>,
        last_fired: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        self.state.snoozed = false;
        match compute_next_fire(&self.tz, &self.schedule, from, last_fired) {
            Ok(next_fire_at) => {
                self.state.next_fire_at = next_fire_at;
                info!(%next_fire_at, "next alarm scheduled");
                vec![Event::NextFireScheduled { next_fire_at, at: now }]
            }
            Err(e) => {
                // Schedules are checked non-empty on construction and reload.
                error!(error = %e, "cannot compute next fire time");
                Vec::new()
            }
        }
    }
}

fn compute_next_fire<Tz: TimeZone>(
    tz: &Tz,
    schedule: &WeeklySchedule,
    from: DateTime<Utc>,
    last_fired: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>, ScheduleError> {
    let local_from = from.with_timezone(tz);
    let local_last = last_fired.map(|t| t.with_timezone(tz));
    next_fire_time(schedule, &local_from, local_last.as_ref()).map(|t| t.with_timezone(&Utc))
}

//! Foreground alarm loop.
//!
//! One cooperative task multiplexes the fire deadline, stdin (answers and
//! `:`-commands), the feed cadence, the heartbeat and finished refreshes.
//! Everything that can block for long (HTTP) runs in spawned tasks.

use chrono::{DateTime, Duration, Local, Utc};
use clap::Args;
use dawnlock_core::alarm::{player_for, AlarmEngine, AlarmLedger, AudioPlayer, SilentPlayer};
use dawnlock_core::cache::RecordName;
use dawnlock_core::heartbeat::ClockWatch;
use dawnlock_core::puzzle::PuzzleHistory;
use dawnlock_core::updater::{FeedKind, FeedPayload, UpdaterCoordinator};
use dawnlock_core::{CacheStore, Config, Dashboard, Event, FetchError, Heartbeat};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::CliResult;

#[derive(Args)]
pub struct RunArgs {
    /// Ring once right after startup, without touching the schedule
    #[arg(long)]
    pub debug_alarm: bool,
    /// Print events as JSON lines instead of text
    #[arg(long)]
    pub json: bool,
    /// Never start the audio player
    #[arg(long)]
    pub silent: bool,
}

const HELP: &str = "commands: :debug  :snooze  :disable  :reload  :status  :quit";

/// Upper bound for configured second intervals, one week.
const MAX_INTERVAL_SECS: u64 = 7 * 24 * 3600;

type RefreshResult = (FeedKind, Result<FeedPayload, FetchError>);

pub fn run(args: RunArgs) -> CliResult {
    super::runtime()?.block_on(run_loop(args))
}

struct Runner {
    config: Config,
    store: CacheStore,
    engine: AlarmEngine<Local>,
    updater: UpdaterCoordinator,
    refreshes: JoinSet<RefreshResult>,
    /// Fire instant the pre-alarm refresh already ran for.
    prefetched_for: Option<DateTime<Utc>>,
    /// Prompt to show once the memory sequence on screen is hidden.
    hidden_prompt: Option<(Instant, String)>,
    json: bool,
    quit: bool,
}

async fn run_loop(args: RunArgs) -> CliResult {
    let config = Config::load()?;
    let store = CacheStore::open_default()?;
    let now = Utc::now();

    let audio: Box<dyn AudioPlayer> = if args.silent {
        Box::new(SilentPlayer::default())
    } else {
        player_for(&config.audio.command)
    };
    let history: PuzzleHistory = load_or_default(&store, RecordName::PuzzleHistory);
    let ledger: AlarmLedger = load_or_default(&store, RecordName::AlarmLedger);

    let engine = AlarmEngine::new(
        Local,
        config.alarm_settings(),
        config.weekly_schedule(),
        config.puzzle_selector(),
        audio,
        now,
    )?
    .with_history(history);
    let updater = super::updater(&config, store.clone())?;

    let heartbeat_secs = config.daemon.heartbeat_secs.clamp(1, MAX_INTERVAL_SECS);
    let heartbeat_every = std::time::Duration::from_secs(heartbeat_secs);
    let heartbeat_expected = Duration::seconds(heartbeat_secs as i64);
    let cadence_every = std::time::Duration::from_secs(u64::from(config.updater.cadence_minutes.max(1)) * 60);
    let mut clock = ClockWatch::new(now, Duration::seconds(config.daemon.suspend_jump_secs.min(MAX_INTERVAL_SECS) as i64));

    let mut runner = Runner {
        config,
        store,
        engine,
        updater,
        refreshes: JoinSet::new(),
        prefetched_for: None,
        hidden_prompt: None,
        json: args.json,
        quit: false,
    };

    let events = runner.engine.restore(ledger, now);
    runner.handle(events);
    if args.debug_alarm {
        let events = runner.engine.debug_trigger(Utc::now());
        runner.handle(events);
    }
    runner.spawn_stale_refreshes(Utc::now());
    if !runner.json {
        println!("{HELP}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut heartbeat = tokio::time::interval(heartbeat_every);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cadence = tokio::time::interval_at(Instant::now() + cadence_every, cadence_every);
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !runner.quit {
        let wait = (runner.wake_at() - Utc::now()).to_std().unwrap_or_default();
        let reveal_until = runner.hidden_prompt.as_ref().map(|(until, _)| *until);

        tokio::select! {
            _ = tokio::time::sleep(wait), if !runner.engine.phase().is_active() => runner.on_deadline(Utc::now()),
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => runner.on_line(line.trim(), Utc::now()),
                Ok(None) => {
                    debug!("stdin closed");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
            _ = tokio::time::sleep_until(reveal_until.unwrap_or_else(Instant::now)), if reveal_until.is_some() => {
                runner.hide_reveal();
            }
            _ = cadence.tick() => runner.on_cadence(),
            _ = heartbeat.tick() => {
                let now = Utc::now();
                if let Some(jump) = clock.observe(now, heartbeat_expected) {
                    info!(jump_secs = jump.num_seconds(), "clock jump detected, resyncing");
                    let events = runner.engine.resync(now);
                    runner.handle(events);
                }
                runner.beat(now);
            }
            Some(joined) = runner.refreshes.join_next(), if !runner.refreshes.is_empty() => match joined {
                Ok((kind, result)) => runner.on_refresh(kind, result, Utc::now()),
                Err(e) => {
                    warn!(error = %e, "refresh task failed");
                    if runner.refreshes.is_empty() {
                        runner.updater.clear_in_flight();
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                runner.quit = true;
            }
        }
    }

    runner.shutdown();
    Ok(())
}

impl Runner {
    /// Next instant the loop must wake for: the pre-alarm refresh, then the
    /// fire time itself.
    fn wake_at(&self) -> DateTime<Utc> {
        let fire = self.engine.next_fire_at();
        let lead = Duration::minutes(i64::from(self.config.updater.prefetch_lead_minutes));
        if self.engine.settings().check_internet && self.prefetched_for != Some(fire) {
            fire - lead
        } else {
            fire
        }
    }

    fn on_deadline(&mut self, now: DateTime<Utc>) {
        let fire = self.engine.next_fire_at();
        if self.prefetched_for != Some(fire) {
            self.prefetched_for = Some(fire);
            self.spawn_stale_refreshes(now);
        }
        let events = self.engine.poll(now);
        self.handle(events);
    }

    fn on_line(&mut self, line: &str, now: DateTime<Utc>) {
        let events = match line {
            "" => return,
            ":debug" => self.engine.debug_trigger(now),
            ":snooze" => {
                if self.engine.settings().snooze_minutes.is_none() {
                    self.say("Snooze is not enabled (alarm.snooze_minutes).");
                }
                self.engine.snooze(now)
            }
            ":disable" => self.engine.disable_now(now),
            ":reload" => self.reload(now),
            ":status" => vec![self.engine.snapshot(now)],
            ":quit" => {
                self.quit = true;
                return;
            }
            ":help" => {
                self.say(HELP);
                return;
            }
            _ if self.hidden_prompt.is_some() => {
                self.say("Wait until the sequence is hidden.");
                return;
            }
            answer if self.engine.current_puzzle().is_some() => self.engine.submit_answer(answer, now),
            _ => {
                self.say("No puzzle is active.");
                return;
            }
        };
        self.handle(events);
    }

    fn reload(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "reload failed, keeping current settings");
                self.say(&format!("Reload failed: {e}"));
                return Vec::new();
            }
        };
        match self
            .engine
            .reload(config.alarm_settings(), config.weekly_schedule(), now)
        {
            Ok(events) => {
                self.updater.set_policy(config.updater_policy());
                self.config = config;
                events
            }
            Err(e) => {
                error!(error = %e, "reload rejected");
                self.say(&format!("Reload rejected: {e}"));
                Vec::new()
            }
        }
    }

    fn on_cadence(&mut self) {
        for kind in self.updater.begin_cadence_tick() {
            self.spawn_refresh(kind);
        }
    }

    fn on_refresh(&mut self, kind: FeedKind, result: Result<FeedPayload, FetchError>, now: DateTime<Utc>) {
        let outcome = self.updater.apply(kind, result, now);
        let event = outcome.event(kind, now);
        self.handle(vec![event]);
    }

    fn spawn_stale_refreshes(&mut self, now: DateTime<Utc>) {
        for kind in FeedKind::ALL {
            if self.updater.wants_refresh(kind, now) {
                self.spawn_refresh(kind);
            }
        }
    }

    fn spawn_refresh(&mut self, kind: FeedKind) {
        let task = self.updater.fetch_task(kind);
        self.refreshes.spawn(async move { (kind, task.await) });
    }

    fn beat(&mut self, now: DateTime<Utc>) {
        let beat = Heartbeat::now(self.engine.phase(), self.engine.next_fire_at(), now);
        if let Err(e) = self.store.save(RecordName::Heartbeat, &beat) {
            error!(error = %e, "failed to write heartbeat");
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(RecordName::AlarmLedger, self.engine.ledger()) {
            error!(error = %e, "failed to save alarm ledger");
        }
        if let Err(e) = self.store.save(RecordName::PuzzleHistory, self.engine.history()) {
            error!(error = %e, "failed to save puzzle history");
        }
    }

    fn handle(&mut self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        let alarm_changed = events
            .iter()
            .any(|e| !matches!(e, Event::FeedRefreshed { .. } | Event::FeedFallback { .. }));
        if alarm_changed {
            self.persist();
        }

        for event in &events {
            if self.json {
                match serde_json::to_string(event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => error!(error = %e, "failed to encode event"),
                }
                continue;
            }
            self.print(event);
            if matches!(event, Event::AlarmDisabled { .. }) {
                let dashboard = Dashboard::assemble(
                    &self.store,
                    &self.config.schedule,
                    self.updater.policy(),
                    Local::now(),
                );
                println!("\n{}", dashboard.render());
            }
        }
    }

    /// Erase the memorize line and show the answer prompt.
    fn hide_reveal(&mut self) {
        if let Some((_, prompt)) = self.hidden_prompt.take() {
            // Cursor up one line, clear it.
            print!("\x1b[1A\x1b[2K");
            println!("{prompt}");
        }
    }

    fn print(&mut self, event: &Event) {
        let local = |t: &DateTime<Utc>| t.with_timezone(&Local).format("%a %H:%M").to_string();
        match event {
            Event::AlarmFired { reason, .. } => {
                println!("\n*** WAKE UP *** ({reason:?})");
            }
            Event::AlarmMissed { scheduled_for, .. } => {
                println!("Missed the alarm at {} (machine was asleep).", local(scheduled_for));
            }
            Event::PuzzlePresented {
                number,
                required,
                kind,
                reveal,
                prompt,
                ..
            } => {
                println!("\nPuzzle {number}/{required} [{kind}]");
                match reveal {
                    Some(reveal) => {
                        println!("{reveal}");
                        let shown_for = std::time::Duration::from_secs(self.config.puzzles.memory_reveal_secs);
                        self.hidden_prompt = Some((Instant::now() + shown_for, prompt.clone()));
                    }
                    None => println!("{prompt}"),
                }
            }
            Event::AnswerRejected { .. } => println!("Not quite. Try again."),
            Event::AnswerAccepted {
                puzzles_solved,
                required,
                ..
            } => println!("Correct! ({puzzles_solved}/{required})"),
            Event::AlarmSnoozed { until, .. } => println!("Snoozed until {}.", local(until)),
            Event::AlarmDisabled { forced, .. } => {
                self.hidden_prompt = None;
                if *forced {
                    println!("Alarm disabled by override.");
                } else {
                    println!("Alarm off. Good morning!");
                }
            }
            Event::NextFireScheduled { next_fire_at, .. } => {
                println!("Next alarm: {}", local(next_fire_at));
            }
            Event::AudioFailed { message, .. } => println!("(no sound: {message})"),
            Event::SettingsReloaded { deferred, .. } => {
                if *deferred {
                    println!("Settings reloaded; they apply after this alarm.");
                } else {
                    println!("Settings reloaded.");
                }
            }
            Event::FeedRefreshed { kind, .. } => debug!(%kind, "feed refreshed"),
            Event::FeedFallback { kind, reason, .. } => debug!(%kind, %reason, "feed fallback"),
            Event::StateSnapshot {
                phase,
                puzzles_solved,
                next_fire_at,
                ..
            } => println!(
                "Phase: {phase:?}, solved: {puzzles_solved}, next alarm: {}",
                local(next_fire_at)
            ),
        }
    }

    fn say(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }

    fn shutdown(&mut self) {
        self.refreshes.abort_all();
        self.engine.shutdown();
        self.persist();
        info!("runner stopped");
    }
}

/// Missing or unreadable records start empty; the runner must come up.
fn load_or_default<T: DeserializeOwned + Default>(store: &CacheStore, name: RecordName) -> T {
    match store.load(name) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(record = %name, error = %e, "unreadable record, starting fresh");
            T::default()
        }
    }
}

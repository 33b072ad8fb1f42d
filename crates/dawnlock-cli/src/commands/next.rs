use chrono::{Local, Utc};
use dawnlock_core::alarm::AlarmLedger;
use dawnlock_core::schedule::next_event;
use dawnlock_core::{next_fire_time, CacheStore, Config, RecordName};
use serde_json::json;

use super::CliResult;

pub fn run(json: bool) -> CliResult {
    let config = Config::load()?;
    let store = CacheStore::open_default()?;
    let now = Local::now();

    // Skip an instant that already fired this second.
    let ledger: AlarmLedger = store.load(RecordName::AlarmLedger)?.unwrap_or_default();
    let last_fired = ledger.last_fired_at.map(|t| t.with_timezone(&Local));
    let next = next_fire_time(&config.schedule, &now, last_fired.as_ref())?;
    let event = next_event(&config.schedule, &now);
    let until = next.with_timezone(&Utc) - now.with_timezone(&Utc);

    if json {
        let value = json!({
            "next_fire_at": next.to_rfc3339(),
            "minutes_until": until.num_minutes(),
            "puzzles_required": config.alarm.puzzles_required,
            "difficulty": config.alarm.puzzle_difficulty,
            "next_event": event,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "Next alarm: {} (in {}h {:02}m)",
            next.format("%a %Y-%m-%d %H:%M"),
            until.num_hours(),
            until.num_minutes() % 60
        );
        println!(
            "Puzzles to disable: {} ({})",
            config.alarm.puzzles_required, config.alarm.puzzle_difficulty
        );
        if let Some(event) = event {
            println!("Next event: {} at {}", event.label, event.at.format("%a %H:%M"));
        }
    }
    Ok(())
}

use chrono::{Duration, Local, Utc};
use dawnlock_core::heartbeat::Liveness;
use dawnlock_core::{CacheStore, Config, Heartbeat, RecordName};
use serde_json::json;

use super::CliResult;

/// Exit code when no runner is alive.
const EXIT_STALE: i32 = 2;

pub fn run(json: bool) -> CliResult {
    let config = Config::load()?;
    let store = CacheStore::open_default()?;
    let now = Utc::now();
    let stale_after = Duration::seconds(config.daemon.heartbeat_stale_secs.min(7 * 24 * 3600) as i64);

    let beat: Option<Heartbeat> = store.load(RecordName::Heartbeat)?;
    let liveness = beat.as_ref().map(|b| b.liveness(now, stale_after));

    if json {
        let value = json!({
            "alive": liveness == Some(Liveness::Alive),
            "heartbeat": beat,
            "age_secs": beat.as_ref().map(|b| b.age(now).num_seconds()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match &beat {
            Some(b) => {
                println!(
                    "Runner pid {} last seen {}s ago ({:?})",
                    b.pid,
                    b.age(now).num_seconds(),
                    b.phase
                );
                println!(
                    "Next alarm: {}",
                    b.next_fire_at.with_timezone(&Local).format("%a %Y-%m-%d %H:%M")
                );
            }
            None => println!("No runner has reported yet."),
        }
    }

    if liveness != Some(Liveness::Alive) {
        if !json {
            eprintln!("runner is not alive");
        }
        std::process::exit(EXIT_STALE);
    }
    Ok(())
}

use chrono::Utc;
use clap::Args;
use dawnlock_core::updater::{FeedKind, RefreshOutcome};
use dawnlock_core::{CacheStore, Config};

use super::CliResult;

#[derive(Args)]
pub struct RefreshArgs {
    /// weather or news (default: both)
    pub kind: Option<FeedKind>,
    /// Print JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RefreshArgs) -> CliResult {
    let config = Config::load()?;
    let store = CacheStore::open_default()?;
    let mut updater = super::updater(&config, store)?;
    let kinds = match args.kind {
        Some(kind) => vec![kind],
        None => FeedKind::ALL.to_vec(),
    };

    let outcomes = super::runtime()?.block_on(async {
        let mut outcomes = Vec::new();
        for kind in kinds {
            outcomes.push((kind, updater.refresh(kind, Utc::now()).await));
        }
        outcomes
    });

    if args.json {
        let value: Vec<_> = outcomes
            .iter()
            .map(|(kind, outcome)| serde_json::json!({ "kind": kind, "result": outcome }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for (kind, outcome) in &outcomes {
            match outcome {
                RefreshOutcome::Live => println!("{kind}: updated"),
                RefreshOutcome::StaleFallback { reason } => {
                    println!("{kind}: failed ({reason}), keeping cached data")
                }
                RefreshOutcome::Failed { reason } => println!("{kind}: failed ({reason})"),
            }
        }
    }
    Ok(())
}

use chrono::{Local, Utc};
use clap::Args;
use dawnlock_core::updater::FeedKind;
use dawnlock_core::{CacheStore, Config, Dashboard};

use super::CliResult;

#[derive(Args)]
pub struct DashboardArgs {
    /// Refresh stale feeds before showing
    #[arg(long)]
    pub refresh: bool,
    /// Print JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: DashboardArgs) -> CliResult {
    let config = Config::load()?;
    let store = CacheStore::open_default()?;

    if args.refresh {
        let mut updater = super::updater(&config, store.clone())?;
        super::runtime()?.block_on(async {
            for kind in FeedKind::ALL {
                updater.refresh_if_stale(kind, Utc::now()).await;
            }
        });
    }

    let dashboard = Dashboard::assemble(&store, &config.schedule, &config.updater_policy(), Local::now());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        print!("{}", dashboard.render());
    }
    Ok(())
}

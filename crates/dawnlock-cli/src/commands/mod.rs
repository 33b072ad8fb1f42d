pub mod config;
pub mod dashboard;
pub mod next;
pub mod puzzle;
pub mod refresh;
pub mod reminder;
pub mod run;
pub mod status;

use std::sync::Arc;

use dawnlock_core::updater::{FeedKind, Fetcher, HttpFetcher, UpdaterCoordinator};
use dawnlock_core::{CacheStore, Config};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Single-threaded runtime for the async commands.
fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn updater(config: &Config, store: CacheStore) -> CliResult<UpdaterCoordinator> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
        config.feed_url(FeedKind::Weather),
        config.feed_url(FeedKind::News),
    )?);
    Ok(UpdaterCoordinator::new(fetcher, store, config.updater_policy()))
}

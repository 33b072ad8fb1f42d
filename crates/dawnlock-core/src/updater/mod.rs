mod coordinator;
mod fetcher;

pub use coordinator::{RefreshOutcome, Staleness, UpdaterCoordinator, UpdaterPolicy};
pub use fetcher::{parse_news, parse_weather, FeedKind, FeedPayload, Fetcher, HttpFetcher};

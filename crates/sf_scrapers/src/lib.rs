pub mod cli;
pub mod dates;
pub mod fetch;
pub mod logging;
pub mod manager;
pub mod pipeline;
pub mod scrapers;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use fetch::{FetchOptions, HttpFetcher, PageFetcher};
pub use logging::{init_logging, Logger, TraceLine};
pub use manager::FeedManager;
pub use pipeline::{new_item_urls, FeedSync, SkippedItem, Stage, SyncOptions, SyncReport};
pub use scrapers::get_site_adapters;

pub mod prelude {
    pub use super::pipeline::FeedSync;
    pub use sf_core::{Error, Item, Result, SiteAdapter};
}

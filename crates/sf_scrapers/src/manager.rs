use std::sync::Arc;

use futures::future::join_all;
use sf_core::{Error, Item, Result, Settings, SiteAdapter, SiteMetadata};
use sf_storage::create_storage;

use crate::fetch::{FetchOptions, HttpFetcher};
use crate::pipeline::{FeedSync, SyncOptions, SyncReport};

/// Every registered site with its store and fetcher.
#[derive(Default)]
pub struct FeedManager {
    feeds: Vec<Arc<FeedSync>>,
}

impl FeedManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens one store per site and builds a fetcher honouring each site's
    /// TLS requirements.
    pub async fn from_settings(
        settings: &Settings,
        adapters: Vec<Arc<dyn SiteAdapter>>,
    ) -> Result<Self> {
        let mut manager = Self::new();
        for adapter in adapters {
            let id = adapter.metadata().id.clone();
            let storage = create_storage(&settings.storage, &settings.data_dir, &id).await?;
            let options = FetchOptions::from_settings(settings)
                .accept_invalid_certs(adapter.accepts_invalid_certs());
            let fetcher = Arc::new(HttpFetcher::new(options)?);

            tracing::debug!(site = %id, storage = %settings.storage, "Registered site");
            manager.add_feed(FeedSync::new(
                adapter,
                storage,
                fetcher,
                SyncOptions::from(settings),
            ));
        }
        Ok(manager)
    }

    pub fn add_feed(&mut self, feed: FeedSync) {
        self.feeds.push(Arc::new(feed));
    }

    pub fn feeds(&self) -> &[Arc<FeedSync>] {
        &self.feeds
    }

    pub fn sites(&self) -> Vec<SiteMetadata> {
        self.feeds.iter().map(|f| f.metadata().clone()).collect()
    }

    /// Looks a site up by id or by one of its CLI names.
    pub fn get(&self, name: &str) -> Result<Arc<FeedSync>> {
        let name = name.to_lowercase();
        self.feeds
            .iter()
            .find(|f| {
                f.metadata().id == name || f.adapter().cli_names().iter().any(|n| *n == name)
            })
            .cloned()
            .ok_or(Error::UnknownSite(name))
    }

    pub fn get_for_url(&self, url: &str) -> Result<Arc<FeedSync>> {
        self.feeds
            .iter()
            .find(|f| f.adapter().can_handle(url))
            .cloned()
            .ok_or_else(|| Error::Scraping(format!("No scraper found for URL: {}", url)))
    }

    /// Runs every site once. Sites run concurrently; a failing site does not
    /// stop the others.
    pub async fn sync_all(&self) -> Vec<(String, Result<SyncReport>)> {
        let runs = self.feeds.iter().map(|feed| async move {
            let logger = feed.logger(false);
            let result = feed.sync(&logger).await;
            if let Err(e) = &result {
                logger.error(&format!("Run failed: {}", e));
            }
            (feed.metadata().id.clone(), result)
        });
        join_all(runs).await
    }

    /// Extracts one item with the site that handles `url`.
    pub async fn scrape_url(&self, url: &str) -> Result<Item> {
        self.get_for_url(url)?.scrape_item(url).await
    }
}

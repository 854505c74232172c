use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sf_core::feed::{render_rss, render_rss_pretty};
use sf_core::config::DEFAULT_RETENTION;
use sf_core::{Error, Item, ItemStorage, Result, Settings, SiteAdapter, SiteMetadata, UpsertPolicy};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::fetch::PageFetcher;
use crate::logging::Logger;

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub retention: usize,
    pub policy: UpsertPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            policy: UpsertPolicy::default(),
        }
    }
}

impl From<&Settings> for SyncOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            retention: settings.retention,
            policy: settings.policy,
        }
    }
}

/// Step at which a single item was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Extract,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Store => "store",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub url: String,
    pub stage: Stage,
    pub reason: String,
}

/// Outcome of one run for one site.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub site: String,
    /// Distinct URLs on the listing page.
    pub listed: usize,
    /// Listed URLs the store did not hold before the run.
    pub new: usize,
    pub fetched: usize,
    pub skipped: Vec<SkippedItem>,
    pub written: usize,
    pub unchanged: usize,
    pub pruned: u64,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} listed, {} new, {} written, {} unchanged, {} skipped, {} pruned",
            self.site,
            self.listed,
            self.new,
            self.written,
            self.unchanged,
            self.skipped.len(),
            self.pruned
        )
    }
}

/// Awaits `fut` unless `deadline` passes first.
async fn before<T>(deadline: Option<Instant>, fut: impl Future<Output = T>) -> Option<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Listing URLs missing from `known`, in listing order, each URL once.
pub fn new_item_urls(listing: &[String], known: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    listing
        .iter()
        .filter(|url| !known.contains(*url) && seen.insert(url.as_str()))
        .cloned()
        .collect()
}

/// Scrape, store and render pipeline of a single site.
pub struct FeedSync {
    adapter: Arc<dyn SiteAdapter>,
    storage: Arc<dyn ItemStorage>,
    fetcher: Arc<dyn PageFetcher>,
    options: SyncOptions,
    lock: Mutex<()>,
}

impl FeedSync {
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        storage: Arc<dyn ItemStorage>,
        fetcher: Arc<dyn PageFetcher>,
        options: SyncOptions,
    ) -> Self {
        Self {
            adapter,
            storage,
            fetcher,
            options,
            lock: Mutex::new(()),
        }
    }

    pub fn metadata(&self) -> &SiteMetadata {
        self.adapter.metadata()
    }

    pub fn adapter(&self) -> &Arc<dyn SiteAdapter> {
        &self.adapter
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Logger prefixed with the site id.
    pub fn logger(&self, traced: bool) -> Logger {
        let logger = if traced { Logger::traced() } else { Logger::new() };
        logger.with_new_prefixes(format!("[{}]", self.metadata().id))
    }

    /// Runs the pipeline once. Concurrent calls for the same site wait for
    /// each other.
    pub async fn sync(&self, logger: &Logger) -> Result<SyncReport> {
        let _guard = self.lock.lock().await;
        self.run(logger, None).await
    }

    /// Renders the feed from what the store currently holds.
    pub async fn render(&self, pretty: bool) -> Result<String> {
        let items = self.storage.latest(self.options.retention).await?;
        if pretty {
            render_rss_pretty(self.metadata(), &items)
        } else {
            render_rss(self.metadata(), &items)
        }
    }

    /// Runs the pipeline and renders the result without letting another run
    /// in between.
    pub async fn sync_and_render(&self, logger: &Logger, pretty: bool) -> Result<(SyncReport, String)> {
        let _guard = self.lock.lock().await;
        self.run_and_render(logger, pretty, None).await
    }

    /// Like [`FeedSync::sync_and_render`], bounded by `budget`. Waiting for
    /// another run or for the listing page past the budget is a timeout.
    /// Items still pending when the budget runs out are skipped and whatever
    /// was fetched until then is stored.
    pub async fn sync_and_render_within(
        &self,
        logger: &Logger,
        pretty: bool,
        budget: Duration,
    ) -> Result<(SyncReport, String)> {
        let deadline = Instant::now() + budget;
        let _guard = before(Some(deadline), self.lock.lock())
            .await
            .ok_or_else(|| self.timed_out("waiting for a running sync", budget))?;
        self.run_and_render(logger, pretty, Some(deadline)).await
    }

    async fn run_and_render(
        &self,
        logger: &Logger,
        pretty: bool,
        deadline: Option<Instant>,
    ) -> Result<(SyncReport, String)> {
        let report = self.run(logger, deadline).await?;
        let feed = self.render(pretty).await?;
        logger.info(&format!("Rendered feed ({} bytes)", feed.len()));
        Ok((report, feed))
    }

    fn timed_out(&self, during: &str, budget: Duration) -> Error {
        Error::Timeout(format!(
            "{} run exceeded {:?} {}",
            self.metadata().id,
            budget,
            during
        ))
    }

    /// Fetches and extracts one item without storing it.
    pub async fn scrape_item(&self, url: &str) -> Result<Item> {
        if !self.adapter.can_handle(url) {
            return Err(Error::Scraping(format!(
                "{} does not belong to {}",
                url,
                self.metadata().id
            )));
        }
        self.fetch_item(url).await.map_err(|(_, e)| e)
    }

    async fn fetch_item(&self, url: &str) -> std::result::Result<Item, (Stage, Error)> {
        let page = self.fetcher.fetch(url).await.map_err(|e| (Stage::Fetch, e))?;
        self.adapter
            .extract_item(url, &page)
            .and_then(|draft| draft.finish())
            .map_err(|e| (Stage::Extract, e))
    }

    async fn run(&self, logger: &Logger, deadline: Option<Instant>) -> Result<SyncReport> {
        let mut report = SyncReport {
            site: self.metadata().id.clone(),
            ..SyncReport::default()
        };

        let known = self.storage.known_urls().await?;
        logger.info(&format!("Read stored items: {}", known.len()));

        let listing_url = self.adapter.listing_url();
        let page = before(deadline, self.fetcher.fetch(listing_url))
            .await
            .ok_or_else(|| Error::Timeout(format!("listing page {}", listing_url)))??;
        logger.info(&format!("Loaded listing page: {}", listing_url));

        let listed = self.adapter.list_item_urls(listing_url, &page)?;
        let listed = new_item_urls(&listed, &HashSet::new());
        report.listed = listed.len();
        logger.info(&format!("Extracted item URLs: {}", listed.len()));

        let new = new_item_urls(&listed, &known);
        report.new = new.len();
        logger.info(&format!("Counted missing items: {}", new.len()));

        let candidates = match self.options.policy {
            UpsertPolicy::Overwrite => listed,
            UpsertPolicy::SkipKnown => new,
        };

        let mut items = Vec::with_capacity(candidates.len());
        for url in &candidates {
            let fetched = if deadline.is_some_and(|d| Instant::now() >= d) {
                None
            } else {
                before(deadline, self.fetch_item(url)).await
            };
            let fetched = fetched.unwrap_or_else(|| {
                Err((Stage::Fetch, Error::Timeout("run deadline reached".to_string())))
            });
            match fetched {
                Ok(item) => {
                    logger.debug(&format!("Item loaded: {}", url));
                    items.push(item);
                }
                Err((stage, e)) => {
                    logger.warn(&format!("Skipping {} ({} failed): {}", url, stage, e));
                    report.skipped.push(SkippedItem {
                        url: url.clone(),
                        stage,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.fetched = items.len();

        let applied = self
            .storage
            .apply(&items, self.options.policy, self.options.retention)
            .await?;
        report.written = applied.written;
        report.unchanged = applied.unchanged;
        report.pruned = applied.pruned;
        for url in applied.failed {
            logger.warn(&format!("Skipping {} (store failed)", url));
            report.skipped.push(SkippedItem {
                url,
                stage: Stage::Store,
                reason: "insert failed".to_string(),
            });
        }

        logger.info(&format!(
            "Stored {} items, left {} unchanged, pruned {}",
            report.written, report.unchanged, report.pruned
        ));
        Ok(report)
    }
}

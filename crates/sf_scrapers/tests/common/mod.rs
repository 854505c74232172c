// Shared fixtures for the pipeline integration tests: a fetcher serving
// canned pages and builders for dlapilota.pl-shaped markup.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sf_core::{Error, Result};
use sf_scrapers::fetch::PageFetcher;

pub const LISTING_URL: &str = "https://dlapilota.pl/wiadomosci";

#[derive(Default)]
pub struct StaticFetcher {
    pages: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
    stalled: Mutex<HashSet<String>>,
}

impl StaticFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, url: &str, body: String) {
        self.pages.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn remove(&self, url: &str) {
        self.pages.lock().unwrap().remove(url);
    }

    /// Requests for `url` never complete.
    pub fn stall(&self, url: &str) {
        self.stalled.lock().unwrap().insert(url.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        let stalled = self.stalled.lock().unwrap().contains(url);
        if stalled {
            std::future::pending::<()>().await;
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
    }
}

pub fn item_url(slug: &str) -> String {
    format!("https://dlapilota.pl/wiadomosci/{}", slug)
}

pub fn listing_page(slugs: &[&str]) -> String {
    let cards: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<div class="card-block"><div class="field--name-node-title"><h3><a href="/wiadomosci/{}">{}</a></h3></div></div>"#,
                slug, slug
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="view-articles"><div class="view-content">{}</div></div></body></html>"#,
        cards
    )
}

/// `date` uses the site format, e.g. `22.12.2023 10:30`.
pub fn article_page(title: &str, date: &str, body: &str) -> String {
    format!(
        r#"<html><body>
        <div class="field--name-node-title"><h2>{}</h2></div>
        <div class="field--name-node-post-date"><div class="field__item"><span class="item">{}</span></div></div>
        <div class="field--name-field-body">{}</div>
        </body></html>"#,
        title, date, body
    )
}

/// Serves a listing of `slugs` where item `n` was published on day `10 + n`
/// of December 2023.
pub fn serve_site(fetcher: &StaticFetcher, slugs: &[&str]) {
    fetcher.set(LISTING_URL, listing_page(slugs));
    for (n, slug) in slugs.iter().enumerate() {
        fetcher.set(
            &item_url(slug),
            article_page(
                &format!("Artykuł {}", slug),
                &format!("{}.12.2023 12:00", 10 + n),
                &format!("<p>Treść {}</p>", slug),
            ),
        );
    }
}

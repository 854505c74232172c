use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sf_core::{Error, Result, Settings};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Source of raw page bodies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

impl FetchOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            timeout: settings.fetch_timeout(),
            max_retries: settings.max_retries,
            retry_backoff: settings.retry_backoff(),
            user_agent: settings.user_agent.clone(),
            accept_invalid_certs: false,
        }
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// reqwest-backed fetcher with a per-request timeout and bounded retries.
pub struct HttpFetcher {
    client: Client,
    options: FetchOptions,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        Ok(Self { client, options })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| request_error(url, e))
    }
}

fn request_error(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("fetching {}", url))
    } else {
        Error::Http(e)
    }
}

/// Delay before retry number `attempt + 1`: the base doubled per attempt.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.options.max_retries => {
                    let delay = backoff_delay(self.options.retry_backoff, attempt);
                    tracing::debug!(%url, attempt, "Fetch failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

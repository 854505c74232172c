use std::sync::Arc;
use std::time::Duration;

use sf_core::Settings;
use sf_scrapers::FeedManager;

pub struct AppState {
    pub manager: Arc<FeedManager>,
    /// Run the pipeline before answering a feed request.
    pub refresh_on_request: bool,
    pub run_timeout: Duration,
}

impl AppState {
    pub fn new(manager: Arc<FeedManager>, settings: &Settings) -> Self {
        Self {
            manager,
            refresh_on_request: settings.refresh_on_request,
            run_timeout: settings.run_timeout(),
        }
    }
}

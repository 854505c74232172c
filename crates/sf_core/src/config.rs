use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::UpsertPolicy;
use crate::{Error, Result};

pub const DEFAULT_RETENTION: usize = 30;

/// Runtime settings. Every field has a default so a partial JSON file is
/// enough; CLI flags are applied on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    /// `sqlite` or `memory`.
    pub storage: String,
    pub bind: String,
    pub retention: usize,
    pub policy: UpsertPolicy,
    pub fetch_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub run_timeout_secs: u64,
    pub user_agent: String,
    pub refresh_on_request: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            storage: "sqlite".to_string(),
            bind: "127.0.0.1:8080".to_string(),
            retention: DEFAULT_RETENTION,
            policy: UpsertPolicy::default(),
            fetch_timeout_secs: 20,
            max_retries: 2,
            retry_backoff_ms: 500,
            run_timeout_secs: 120,
            user_agent: concat!("sitefeeds/", env!("CARGO_PKG_VERSION")).to_string(),
            refresh_on_request: true,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention == 0 {
            return Err(Error::Config("retention must be at least 1".to_string()));
        }
        if self.fetch_timeout_secs == 0 || self.run_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

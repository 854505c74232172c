use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Item;
use crate::{Error, Result};

/// What happens when a fetched item's URL is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertPolicy {
    /// Refetch every listed item and replace the stored row.
    #[default]
    Overwrite,
    /// Only fetch unseen items; stored rows are never touched.
    SkipKnown,
}

impl FromStr for UpsertPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "skip-known" | "skip" => Ok(Self::SkipKnown),
            other => Err(Error::Config(format!("Unknown upsert policy: {}", other))),
        }
    }
}

impl fmt::Display for UpsertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => f.write_str("overwrite"),
            Self::SkipKnown => f.write_str("skip-known"),
        }
    }
}

/// Outcome of one [`ItemStorage::apply`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub written: usize,
    pub unchanged: usize,
    /// URLs whose insert failed and was skipped.
    pub failed: Vec<String>,
    pub pruned: u64,
}

#[async_trait]
pub trait ItemStorage: Send + Sync {
    /// URLs of every stored item.
    async fn known_urls(&self) -> Result<HashSet<String>>;

    /// Writes one item according to `policy`. Returns whether a row was written.
    async fn upsert(&self, item: &Item, policy: UpsertPolicy) -> Result<bool>;

    /// Keeps the `retention` newest items and deletes the rest.
    /// Returns the number of deleted rows.
    async fn prune(&self, retention: usize) -> Result<u64>;

    /// Upserts `items` then prunes to `retention`, as one atomic change.
    /// A failing insert is recorded in the report and does not abort the batch.
    async fn apply(
        &self,
        items: &[Item],
        policy: UpsertPolicy,
        retention: usize,
    ) -> Result<ApplyReport>;

    /// The newest `limit` items, `published_at` descending, ties by url.
    async fn latest(&self, limit: usize) -> Result<Vec<Item>>;
}

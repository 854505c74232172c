pub mod config;
pub mod error;
pub mod feed;
pub mod site;
pub mod storage;
pub mod types;

pub use config::Settings;
pub use error::{Error, Result};
pub use site::SiteAdapter;
pub use storage::{ApplyReport, ItemStorage, UpsertPolicy};
pub use types::{Item, ItemDraft, SiteMetadata};

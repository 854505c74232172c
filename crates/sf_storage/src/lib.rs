use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sf_core::{Error, ItemStorage, Result};

pub mod backends;

pub use backends::*;

/// A store that can be opened for one site.
#[async_trait]
pub trait StorageBackend: ItemStorage + Sized {
    fn get_error_message() -> &'static str;
    async fn open(data_dir: &Path, site_id: &str) -> Result<Self>;
}

/// Opens the store of `site_id` with the backend named `kind`.
pub async fn create_storage(
    kind: &str,
    data_dir: &Path,
    site_id: &str,
) -> Result<Arc<dyn ItemStorage>> {
    if site_id.is_empty()
        || !site_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Config(format!("Invalid site id for storage: {:?}", site_id)));
    }

    match kind {
        "memory" => Ok(Arc::new(open_backend::<InMemoryStorage>(data_dir, site_id).await?)),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(open_backend::<SQLiteStorage>(data_dir, site_id).await?)),
        other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
    }
}

async fn open_backend<T: StorageBackend>(data_dir: &Path, site_id: &str) -> Result<T> {
    T::open(data_dir, site_id).await.map_err(|e| {
        tracing::error!("{} ({})", T::get_error_message(), e);
        e
    })
}

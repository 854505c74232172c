use crate::types::{ItemDraft, SiteMetadata};
use crate::Result;

/// Per-site knowledge of where items are listed and how their pages are laid
/// out. Adapters never touch the network; the pipeline fetches pages and hands
/// the bodies over.
pub trait SiteAdapter: Send + Sync {
    fn metadata(&self) -> &SiteMetadata;

    /// Page enumerating the most recent items.
    fn listing_url(&self) -> &str;

    /// Returns true if `url` belongs to this site.
    fn can_handle(&self, url: &str) -> bool;

    /// Absolute item URLs found on the listing page, in page order.
    fn list_item_urls(&self, listing_url: &str, page: &str) -> Result<Vec<String>>;

    /// Extracts one item from its page.
    fn extract_item(&self, url: &str, page: &str) -> Result<ItemDraft>;

    /// Whether the site has to be fetched without certificate verification.
    fn accepts_invalid_certs(&self) -> bool {
        false
    }

    /// Returns a list of CLI shorthand names for this site
    fn cli_names(&self) -> Vec<&str> {
        vec![self.metadata().id.as_str()]
    }
}

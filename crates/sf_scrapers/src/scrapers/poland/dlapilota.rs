use sf_core::{ItemDraft, Result, SiteAdapter, SiteMetadata};

use crate::dates;
use crate::scrapers::{utils, ArticleRule, ListingRule};

#[derive(Debug, Clone)]
pub struct DlaPilotaScraper {
    metadata: SiteMetadata,
}

impl Default for DlaPilotaScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl DlaPilotaScraper {
    pub fn new() -> Self {
        Self {
            metadata: super::metadata(
                "dlapilota",
                "DlaPilota.pl",
                Self::BASE_URL,
                "Najpopularniejsze źródło informacji na temat małego i dużego lotnictwa",
                "https://dlapilota.pl/themes/custom/dlapilota/logo.svg",
            ),
        }
    }

    const BASE_URL: &'static str = "https://dlapilota.pl";
    const LISTING_URL: &'static str = "https://dlapilota.pl/wiadomosci";
    const DATE_FORMAT: &'static str = "%d.%m.%Y %H:%M";

    const LISTING: ListingRule = ListingRule {
        container: "div.view-articles div.view-content",
        card: "div.card-block",
        link: "div.field--name-node-title h3 a",
    };

    const ARTICLE: ArticleRule = ArticleRule {
        scope: None,
        title: ".field--name-node-title h2",
        date: "div.field--name-node-post-date div.field__item span.item",
        body: &[
            "div.field--name-field-body",
            "div.field--name-field-text-formatted",
        ],
        image: Some("img.image-style-article-cover"),
    };
}

impl SiteAdapter for DlaPilotaScraper {
    fn metadata(&self) -> &SiteMetadata {
        &self.metadata
    }

    fn listing_url(&self) -> &str {
        Self::LISTING_URL
    }

    fn can_handle(&self, url: &str) -> bool {
        utils::on_domain(url, "dlapilota.pl")
    }

    fn list_item_urls(&self, listing_url: &str, page: &str) -> Result<Vec<String>> {
        Self::LISTING.extract(listing_url, page)
    }

    fn extract_item(&self, url: &str, page: &str) -> Result<ItemDraft> {
        let fields = Self::ARTICLE.extract(page)?;
        let published = dates::parse_local(&fields.date_text, Self::DATE_FORMAT)?;
        Ok(super::draft(url, Self::BASE_URL, fields, published))
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["dlapilota", "pilot"]
    }
}

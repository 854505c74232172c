use sf_core::{ItemDraft, Result, SiteAdapter, SiteMetadata};

use crate::dates;
use crate::scrapers::{utils, ArticleRule, ListingRule};

#[derive(Debug, Clone)]
pub struct NuclearPlScraper {
    metadata: SiteMetadata,
}

impl Default for NuclearPlScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl NuclearPlScraper {
    pub fn new() -> Self {
        Self {
            metadata: super::metadata(
                "nuclearpl",
                "Portal nuclear.pl",
                Self::BASE_URL,
                "Najnowsze informacje dotyczące zagadnień jądrowych z kraju i ze świata",
                "https://nuclear.pl/images/nuclear_logo.png",
            ),
        }
    }

    const BASE_URL: &'static str = "https://nuclear.pl";
    const LISTING_URL: &'static str = "https://nuclear.pl/wiadomosci,index,0,0,0.html";

    const LISTING: ListingRule = ListingRule {
        container: "div.article div.main",
        card: "article",
        link: "a",
    };

    // "Data dodania: piątek, 22 grudnia 2023, autor: nuclear.pl"
    const ARTICLE: ArticleRule = ArticleRule {
        scope: Some("div.main"),
        title: "h3.news_tytul",
        date: "p.news_date",
        body: &["div.newsContent div.text"],
        image: Some("div.img div.imageSV img"),
    };
}

impl SiteAdapter for NuclearPlScraper {
    fn metadata(&self) -> &SiteMetadata {
        &self.metadata
    }

    fn listing_url(&self) -> &str {
        Self::LISTING_URL
    }

    fn can_handle(&self, url: &str) -> bool {
        utils::on_domain(url, "nuclear.pl")
    }

    fn list_item_urls(&self, listing_url: &str, page: &str) -> Result<Vec<String>> {
        Self::LISTING.extract(listing_url, page)
    }

    fn extract_item(&self, url: &str, page: &str) -> Result<ItemDraft> {
        let fields = Self::ARTICLE.extract(page)?;
        let published = dates::parse_polish_long(&fields.date_text)?;
        Ok(super::draft(url, Self::BASE_URL, fields, published))
    }

    fn accepts_invalid_certs(&self) -> bool {
        true
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["nuclearpl", "nuclear"]
    }
}

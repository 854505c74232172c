use sf_core::{ItemDraft, Result, SiteAdapter, SiteMetadata};

use crate::dates;
use crate::scrapers::{utils, ArticleRule, ListingRule};

#[derive(Debug, Clone)]
pub struct PodlezePiekielkoScraper {
    metadata: SiteMetadata,
}

impl Default for PodlezePiekielkoScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl PodlezePiekielkoScraper {
    pub fn new() -> Self {
        Self {
            metadata: super::metadata(
                "podlezepiekielko",
                "Podłęże-Piekiełko i Linia 104",
                Self::BASE_URL,
                "Budowa nowej linii kolejowej Podłęże – Szczyrzyc – Tymbark/Mszana Dolna oraz modernizacja istniejącej linii kolejowej nr 104 Chabówka – Nowy Sącz.",
                "https://podleze-piekielko.pl/assets/images/favicons/apple-touch-icon.png",
            ),
        }
    }

    const BASE_URL: &'static str = "https://podleze-piekielko.pl";
    const LISTING_URL: &'static str = "https://podleze-piekielko.pl/wazne-wydarzenia/";
    const DATE_FORMAT: &'static str = "%d.%m.%Y";

    const LISTING: ListingRule = ListingRule {
        container: "div.newsListing div.news-list-view div.listing",
        card: "div.item.topnews",
        link: "div.desc a",
    };

    const ARTICLE: ArticleRule = ArticleRule {
        scope: Some("div.textContent div.newsSingle div.newsTop"),
        title: "div.img h1 span",
        date: "div.img div.date",
        body: &["div.newsContent div.text"],
        image: Some("div.img div.imageSV img"),
    };
}

impl SiteAdapter for PodlezePiekielkoScraper {
    fn metadata(&self) -> &SiteMetadata {
        &self.metadata
    }

    fn listing_url(&self) -> &str {
        Self::LISTING_URL
    }

    fn can_handle(&self, url: &str) -> bool {
        utils::on_domain(url, "podleze-piekielko.pl")
    }

    fn list_item_urls(&self, listing_url: &str, page: &str) -> Result<Vec<String>> {
        Self::LISTING.extract(listing_url, page)
    }

    fn extract_item(&self, url: &str, page: &str) -> Result<ItemDraft> {
        let fields = Self::ARTICLE.extract(page)?;
        let published = dates::parse_local(&fields.date_text, Self::DATE_FORMAT)?;
        Ok(super::draft(url, Self::BASE_URL, fields, published))
    }

    fn accepts_invalid_certs(&self) -> bool {
        true
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["podlezepiekielko", "linia104"]
    }
}

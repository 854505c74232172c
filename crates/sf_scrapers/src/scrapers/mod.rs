use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use sf_core::{Error, Result, SiteAdapter};

pub mod embedded;
pub mod poland;

pub use embedded::EmbeddedJson;

/// Every site the crate knows how to scrape.
pub fn get_site_adapters() -> Vec<Arc<dyn SiteAdapter>> {
    poland::get_scrapers()
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use super::*;
    use url::Url;

    pub fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector {:?}: {}", css, e)))
    }

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
    }

    /// Resolves `href` against `base` the way a browser would.
    pub fn absolutize(base: &str, href: &str) -> Result<String> {
        parse_url(base)?
            .join(href.trim())
            .map(String::from)
            .map_err(|e| Error::InvalidUrl(format!("{} relative to {}: {}", href, base, e)))
    }

    /// Returns true if `url` is on `domain` or one of its subdomains.
    pub fn on_domain(url: &str, domain: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .map(|host| host == domain || host.ends_with(&format!(".{}", domain)))
            .unwrap_or(false)
    }

    pub fn first<'a>(scope: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>> {
        Ok(scope.select(&selector(css)?).next())
    }

    pub fn element_text(element: ElementRef<'_>) -> String {
        element.text().collect::<String>()
    }
}

/// Where item links sit on a listing page.
#[derive(Debug, Clone, Copy)]
pub struct ListingRule {
    pub container: &'static str,
    pub card: &'static str,
    /// Anchor inside a card; its `href` is the item URL.
    pub link: &'static str,
}

impl ListingRule {
    /// A missing container means the layout changed and is an error; a
    /// container without cards is an empty listing. Cards without a link are
    /// skipped.
    pub fn extract(&self, listing_url: &str, page: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(page);
        let container = document
            .select(&utils::selector(self.container)?)
            .next()
            .ok_or_else(|| {
                Error::Scraping(format!("Listing container {:?} not found", self.container))
            })?;

        let card_selector = utils::selector(self.card)?;
        let link_selector = utils::selector(self.link)?;

        let mut urls = Vec::new();
        for card in container.select(&card_selector) {
            let href = card
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty());
            match href {
                Some(href) => urls.push(utils::absolutize(listing_url, href)?),
                None => tracing::debug!(%listing_url, "Card without a link, skipping"),
            }
        }
        Ok(urls)
    }
}

/// Where the fields of an item sit on its page.
#[derive(Debug, Clone, Copy)]
pub struct ArticleRule {
    /// Element every other selector is resolved in; the whole page if unset.
    pub scope: Option<&'static str>,
    pub title: &'static str,
    pub date: &'static str,
    /// Candidates tried in order; the first match provides the body.
    pub body: &'static [&'static str],
    pub image: Option<&'static str>,
}

/// Raw fields taken from an item page.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleFields {
    pub title: String,
    pub date_text: String,
    pub body_html: String,
    pub image_src: Option<String>,
}

impl ArticleRule {
    pub fn extract(&self, page: &str) -> Result<ArticleFields> {
        let document = Html::parse_document(page);
        let root = document.root_element();
        let scope = match self.scope {
            Some(css) => utils::first(root, css)?
                .ok_or_else(|| Error::Scraping(format!("Item container {:?} not found", css)))?,
            None => root,
        };

        let title = utils::first(scope, self.title)?
            .map(utils::element_text)
            .ok_or(Error::MissingField("title"))?;

        let date_text = utils::first(scope, self.date)?
            .map(utils::element_text)
            .ok_or(Error::MissingField("date"))?;

        let mut body_html = None;
        for css in self.body {
            if let Some(body) = utils::first(scope, css)? {
                body_html = Some(body.inner_html());
                break;
            }
        }
        let body_html = body_html.ok_or(Error::MissingField("body"))?;

        let image_src = match self.image {
            Some(css) => utils::first(scope, css)?
                .and_then(|img| img.value().attr("src"))
                .map(str::trim)
                .filter(|src| !src.is_empty())
                .map(str::to_string),
            None => None,
        };

        Ok(ArticleFields {
            title,
            date_text,
            body_html,
            image_src,
        })
    }
}

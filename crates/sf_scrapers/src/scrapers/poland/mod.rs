use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use sf_core::{ItemDraft, SiteAdapter, SiteMetadata};

use crate::scrapers::{utils, ArticleFields};

pub mod dlapilota;
pub mod jedzbezpiecznie;
pub mod nuclearpl;
pub mod podlezepiekielko;

pub use dlapilota::DlaPilotaScraper;
pub use jedzbezpiecznie::JedzBezpiecznieScraper;
pub use nuclearpl::NuclearPlScraper;
pub use podlezepiekielko::PodlezePiekielkoScraper;

/// Returns all available Polish site adapters
pub fn get_scrapers() -> Vec<Arc<dyn SiteAdapter>> {
    vec![
        Arc::new(DlaPilotaScraper::new()),
        Arc::new(NuclearPlScraper::new()),
        Arc::new(PodlezePiekielkoScraper::new()),
        Arc::new(JedzBezpiecznieScraper::new()),
    ]
}

fn metadata(id: &str, title: &str, link: &str, description: &str, logo_url: &str) -> SiteMetadata {
    SiteMetadata {
        id: id.to_string(),
        title: title.to_string(),
        link: link.to_string(),
        description: description.to_string(),
        logo_url: logo_url.to_string(),
    }
}

/// Builds a draft from scraped fields. Image paths are resolved against the
/// site base; an image that does not resolve is dropped.
fn draft(url: &str, base: &str, fields: ArticleFields, published: DateTime<Tz>) -> ItemDraft {
    let image_url = fields.image_src.and_then(|src| match utils::absolutize(base, &src) {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::debug!(%url, "Ignoring image: {}", e);
            None
        }
    });

    ItemDraft {
        url: url.to_string(),
        title: fields.title,
        published: published.fixed_offset(),
        body_html: fields.body_html,
        image_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_scrapers() {
        let scrapers = get_scrapers();
        assert_eq!(scrapers.len(), 4);

        // Test that each scraper can handle its own URLs
        let urls = [
            "https://dlapilota.pl/wiadomosci/lotnictwo/some-article",
            "https://nuclear.pl/wiadomosci,news,23121501,0,0.html",
            "https://podleze-piekielko.pl/wazne-wydarzenia/some-article/",
            "https://krakow.tvp.pl/74880000/some-video",
        ];
        for url in urls {
            let handlers = scrapers.iter().filter(|s| s.can_handle(url)).count();
            assert_eq!(handlers, 1, "{}", url);
        }
        assert!(!scrapers.iter().any(|s| s.can_handle("https://example.org/")));
    }

    #[test]
    fn test_ids_are_unique() {
        let scrapers = get_scrapers();
        let mut ids: Vec<&str> = scrapers.iter().map(|s| s.metadata().id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), scrapers.len());
    }

    #[test]
    fn test_insecure_sites() {
        let insecure: Vec<String> = get_scrapers()
            .iter()
            .filter(|s| s.accepts_invalid_certs())
            .map(|s| s.metadata().id.clone())
            .collect();
        assert_eq!(insecure, vec!["nuclearpl", "podlezepiekielko"]);
    }
}

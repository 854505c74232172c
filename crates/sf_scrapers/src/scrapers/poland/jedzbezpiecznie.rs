use serde_json::Value;
use sf_core::{Error, ItemDraft, Result, SiteAdapter, SiteMetadata};

use crate::dates;
use crate::scrapers::{utils, EmbeddedJson};

/// Video series on krakow.tvp.pl. Both the listing and the video pages carry
/// their data as JSON assigned in an inline script.
#[derive(Debug, Clone)]
pub struct JedzBezpiecznieScraper {
    metadata: SiteMetadata,
}

impl Default for JedzBezpiecznieScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl JedzBezpiecznieScraper {
    pub fn new() -> Self {
        Self {
            metadata: super::metadata(
                "jedzbezpiecznie",
                "Jedź Bezpiecznie TVP",
                Self::BASE_URL,
                "Praktyczne porady dla kierowców",
                "https://s3.tvp.pl/images2/c/8/4/uid_c845be81f638b183571e467d20a7edf31615997731068_width_900_play_0_pos_0_gs_0_height_506.jpg",
            ),
        }
    }

    const BASE_URL: &'static str = "https://krakow.tvp.pl";
    const LISTING_URL: &'static str =
        "https://krakow.tvp.pl/1279100/jedz-bezpiecznie?order=release_date_desc";
    const TITLE_PREFIX: &'static str = "Jedź Bezpiecznie: ";

    const LISTING_DATA: EmbeddedJson = EmbeddedJson {
        start_marker: "window.__websiteData = ",
        end_marker: "</script>",
        trim_tail: 9,
        closing: "}",
    };

    const VIDEO_DATA: EmbeddedJson = EmbeddedJson {
        start_marker: "window.__newsData = ",
        end_marker: "window.__newData",
        trim_tail: 13,
        closing: "}",
    };
}

fn video_url(video: &Value) -> Option<&str> {
    video.get("url").and_then(Value::as_str)
}

fn release_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl SiteAdapter for JedzBezpiecznieScraper {
    fn metadata(&self) -> &SiteMetadata {
        &self.metadata
    }

    fn listing_url(&self) -> &str {
        Self::LISTING_URL
    }

    fn can_handle(&self, url: &str) -> bool {
        utils::on_domain(url, "krakow.tvp.pl")
    }

    fn list_item_urls(&self, _listing_url: &str, page: &str) -> Result<Vec<String>> {
        let data = Self::LISTING_DATA.extract(page)?;
        let videos = data
            .get("videos")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::EmbeddedFormat("listing data has no videos array".into()))?;

        data.get("latestVideo")
            .into_iter()
            .chain(videos.iter())
            .filter_map(video_url)
            .map(|path| utils::absolutize(Self::BASE_URL, path))
            .collect()
    }

    fn extract_item(&self, url: &str, page: &str) -> Result<ItemDraft> {
        let data = Self::VIDEO_DATA.extract(page)?;

        let title = data
            .get("title")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("title"))?;
        let published = data
            .get("release_date_long")
            .and_then(release_timestamp)
            .ok_or(Error::MissingField("release_date_long"))?;
        let body_html = data
            .get("text_paragraph_lead")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("text_paragraph_lead"))?;
        let image_url = data
            .pointer("/image/0/url")
            .and_then(Value::as_str)
            .and_then(|src| utils::absolutize(Self::BASE_URL, src).ok());

        Ok(ItemDraft {
            url: url.to_string(),
            title: format!("{}{}", Self::TITLE_PREFIX, title.trim()),
            published: dates::from_unix(published)?.fixed_offset(),
            body_html: body_html.to_string(),
            image_url,
        })
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["jedzbezpiecznie", "tvp"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_PAGE: &str = r#"<html><head><script>window.__websiteData = {"title":"Jedź bezpiecznie","latestVideo":{"url":"/74880000/odcinek-3","title":"3"},"videos":[{"url":"/74880000/odcinek-3"},{"url":"/74770000/odcinek-2"},{"title":"no url"}]};
    </script></head><body></body></html>"#;

    const VIDEO_PAGE: &str = r#"<html><head><script>window.__newsData = {"title":"Zimowe opony","release_date_long":1702900800000,"text_paragraph_lead":"Kiedy zmienić <b>opony</b>?","image":[{"url":"https://s3.tvp.pl/images/opony.jpg"}]};
    window.__newData = null;</script></head></html>"#;

    #[test]
    fn test_list_item_urls() {
        let scraper = JedzBezpiecznieScraper::new();
        let urls = scraper
            .list_item_urls(scraper.listing_url(), LISTING_PAGE)
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://krakow.tvp.pl/74880000/odcinek-3",
                "https://krakow.tvp.pl/74880000/odcinek-3",
                "https://krakow.tvp.pl/74770000/odcinek-2",
            ]
        );
    }

    #[test]
    fn test_extract_item() {
        let url = "https://krakow.tvp.pl/74880000/odcinek-3";
        let item = JedzBezpiecznieScraper::new()
            .extract_item(url, VIDEO_PAGE)
            .unwrap()
            .finish()
            .unwrap();

        assert_eq!(item.title, "Jedź Bezpiecznie: Zimowe opony");
        assert_eq!(item.published_at, 1702900800);
        assert_eq!(item.published_at_rss, "Mon, 18 Dec 2023 13:00:00 +0100");
        assert_eq!(
            item.body_html,
            "<img src=\"https://s3.tvp.pl/images/opony.jpg\"><br>Kiedy zmienić <b>opony</b>?"
        );
    }

    #[test]
    fn test_seconds_timestamp_and_no_image() {
        let page = VIDEO_PAGE
            .replace("1702900800000", "1702900800")
            .replace(r#","image":[{"url":"https://s3.tvp.pl/images/opony.jpg"}]"#, "");
        let item = JedzBezpiecznieScraper::new()
            .extract_item("https://krakow.tvp.pl/x", &page)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(item.published_at, 1702900800);
        assert_eq!(item.image_url, None);
        assert_eq!(item.body_html, "Kiedy zmienić <b>opony</b>?");
    }

    #[test]
    fn test_layout_changed() {
        let scraper = JedzBezpiecznieScraper::new();
        let err = scraper
            .list_item_urls(scraper.listing_url(), "<script>window.__otherData = {};</script>")
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddedFormat(_)));

        let page = r#"<script>window.__websiteData = {"latestVideo":{"url":"/1"}};</script>"#;
        assert!(matches!(
            scraper.list_item_urls(scraper.listing_url(), page),
            Err(Error::EmbeddedFormat(_))
        ));
    }

    #[test]
    fn test_missing_title() {
        let page = VIDEO_PAGE.replace("\"title\"", "\"name\"");
        let err = JedzBezpiecznieScraper::new()
            .extract_item("https://krakow.tvp.pl/x", &page)
            .unwrap_err();
        assert!(matches!(err, Error::MissingField("title")));
    }
}

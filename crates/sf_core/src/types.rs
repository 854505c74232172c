use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One stored article or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub url: String,
    pub title: String,
    /// Unix timestamp in seconds.
    pub published_at: i64,
    /// RFC 2822 rendering of `published_at`, embedded as-is into `pubDate`.
    pub published_at_rss: String,
    pub body_html: String,
    pub image_url: Option<String>,
}

impl Item {
    pub fn new<Tz: TimeZone>(
        url: impl Into<String>,
        title: impl Into<String>,
        published: &DateTime<Tz>,
        body_html: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        let published = published.fixed_offset();
        Self {
            url: url.into(),
            title: title.into(),
            published_at: published.timestamp(),
            published_at_rss: published.to_rfc2822(),
            body_html: body_html.into(),
            image_url,
        }
    }
}

/// Fields as a site adapter extracted them, before normalisation.
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub url: String,
    pub title: String,
    pub published: DateTime<FixedOffset>,
    pub body_html: String,
    pub image_url: Option<String>,
}

impl ItemDraft {
    /// Trims the title and prepends the image tag to the body when an image
    /// was found.
    pub fn finish(self) -> Result<Item> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::MissingField("title"));
        }

        let body_html = match &self.image_url {
            Some(image) => format!(
                "<img src=\"{}\"><br>{}",
                quick_xml::escape::escape(image.as_str()),
                self.body_html
            ),
            None => self.body_html,
        };

        Ok(Item::new(
            self.url,
            title,
            &self.published,
            body_html,
            self.image_url,
        ))
    }
}

/// Channel-level data of one monitored site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMetadata {
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub logo_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn draft(title: &str, image: Option<&str>) -> ItemDraft {
        ItemDraft {
            url: "https://example.org/a".to_string(),
            title: title.to_string(),
            published: FixedOffset::east_opt(3600)
                .unwrap()
                .with_ymd_and_hms(2023, 12, 22, 10, 30, 0)
                .unwrap(),
            body_html: "<p>Body</p>".to_string(),
            image_url: image.map(str::to_string),
        }
    }

    #[test]
    fn test_finish_trims_title_and_derives_dates() {
        let item = draft("  Hello \n", None).finish().unwrap();
        assert_eq!(item.title, "Hello");
        assert_eq!(item.published_at, 1703237400);
        assert_eq!(item.published_at_rss, "Fri, 22 Dec 2023 10:30:00 +0100");
        assert_eq!(item.body_html, "<p>Body</p>");
        assert_eq!(item.image_url, None);
    }

    #[test]
    fn test_finish_prepends_image() {
        let item = draft("Hello", Some("https://example.org/i.jpg?a=1&b=2"))
            .finish()
            .unwrap();
        assert_eq!(
            item.body_html,
            "<img src=\"https://example.org/i.jpg?a=1&amp;b=2\"><br><p>Body</p>"
        );
        assert_eq!(item.image_url.as_deref(), Some("https://example.org/i.jpg?a=1&b=2"));
    }

    #[test]
    fn test_finish_rejects_blank_title() {
        assert!(matches!(
            draft("   ", None).finish(),
            Err(Error::MissingField("title"))
        ));
    }

    #[test]
    fn test_new_from_utc() {
        let item = Item::new(
            "https://example.org/a",
            "Hello",
            &Utc.timestamp_opt(1700000000, 0).unwrap(),
            "<p>Hi</p>",
            None,
        );
        assert_eq!(item.published_at, 1700000000);
        assert_eq!(item.published_at_rss, "Tue, 14 Nov 2023 22:13:20 +0000");
    }
}

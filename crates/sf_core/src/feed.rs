//! RSS 2.0 rendering of a site's stored items, and a small reader for the
//! same shape.

use std::borrow::Cow;
use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::types::{Item, SiteMetadata};
use crate::{Error, Result};

/// Renders the feed as a compact document.
pub fn render_rss(site: &SiteMetadata, items: &[Item]) -> Result<String> {
    write_feed(Writer::new(Vec::new()), site, items)
}

/// Same document as [`render_rss`], indented for humans.
pub fn render_rss_pretty(site: &SiteMetadata, items: &[Item]) -> Result<String> {
    write_feed(Writer::new_with_indent(Vec::new(), b' ', 2), site, items)
}

fn write_feed(
    mut writer: Writer<Vec<u8>>,
    site: &SiteMetadata,
    items: &[Item],
) -> Result<String> {
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    emit(&mut writer, Event::Start(rss))?;
    emit(&mut writer, Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &site.title)?;
    write_text_element(&mut writer, "link", &site.link)?;
    write_text_element(&mut writer, "description", &site.description)?;

    emit(&mut writer, Event::Start(BytesStart::new("image")))?;
    write_text_element(&mut writer, "url", &site.logo_url)?;
    write_text_element(&mut writer, "title", &site.title)?;
    write_text_element(&mut writer, "link", &site.link)?;
    emit(&mut writer, Event::End(BytesEnd::new("image")))?;

    for item in items {
        emit(&mut writer, Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &item.title)?;
        write_text_element(&mut writer, "link", &item.url)?;
        write_text_element(&mut writer, "pubDate", &item.published_at_rss)?;
        write_cdata_element(&mut writer, "description", &item.body_html)?;
        emit(&mut writer, Event::End(BytesEnd::new("item")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("channel")))?;
    emit(&mut writer, Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Feed(e.to_string()))
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Feed(e.to_string()))
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(&xml_chars(text))))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn write_cdata_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    let text = xml_chars(text);
    for section in cdata_sections(&text) {
        emit(writer, Event::CData(BytesCData::new(section)))?;
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

/// Drops characters XML 1.0 does not allow in a document.
fn xml_chars(text: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
    }
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}

/// Splits `text` so that no section contains the `]]>` terminator.
fn cdata_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find("]]>") {
        sections.push(&rest[..pos + 2]);
        rest = &rest[pos + 2..];
    }
    sections.push(rest);
    sections
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub image_url: String,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
}

/// Reads an RSS 2.0 document back into its channel fields and items.
pub fn parse_rss(xml: &str) -> Result<ParsedFeed> {
    let mut reader = Reader::from_str(xml);
    let mut feed = ParsedFeed::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut current_item: Option<ParsedItem> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    current_item = Some(ParsedItem::default());
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Text(e)) => {
                let unescaped = e.unescape().map_err(|e| Error::Feed(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) => {
                let raw = std::str::from_utf8(&e).map_err(|e| Error::Feed(e.to_string()))?;
                text.push_str(raw);
            }
            Ok(Event::End(_)) => {
                let value = std::mem::take(&mut text);
                let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                match segments.as_slice() {
                    ["rss", "channel", "title"] => feed.title = value,
                    ["rss", "channel", "link"] => feed.link = value,
                    ["rss", "channel", "description"] => feed.description = value,
                    ["rss", "channel", "image", "url"] => feed.image_url = value,
                    ["rss", "channel", "item", field] => {
                        if let Some(item) = current_item.as_mut() {
                            match *field {
                                "title" => item.title = value,
                                "link" => item.link = value,
                                "pubDate" => item.pub_date = value,
                                "description" => item.description = value,
                                _ => {}
                            }
                        }
                    }
                    ["rss", "channel", "item"] => {
                        if let Some(item) = current_item.take() {
                            feed.items.push(item);
                        }
                    }
                    _ => {}
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Feed(format!("XML parse error: {}", e))),
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(Error::Feed("Unexpected end of document".to_string()));
    }

    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn site() -> SiteMetadata {
        SiteMetadata {
            id: "example".to_string(),
            title: "Example & Co".to_string(),
            link: "https://example.org".to_string(),
            description: "News from <example>".to_string(),
            logo_url: "https://example.org/logo.svg".to_string(),
        }
    }

    #[test]
    fn test_single_item_feed() {
        let item = Item::new(
            "https://example.org/a",
            "Hello",
            &Utc.timestamp_opt(1700000000, 0).unwrap(),
            "<p>Hi</p>",
            None,
        );

        let xml = render_rss(&site(), &[item]).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert_eq!(xml.matches("<item>").count(), 1);
        assert!(xml.contains("<title>Hello</title>"));
        assert!(xml.contains("<link>https://example.org/a</link>"));
        assert!(xml.contains("<pubDate>Tue, 14 Nov 2023 22:13:20 +0000</pubDate>"));

        let parsed = parse_rss(&xml).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].description, "<p>Hi</p>");
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let item = Item::new(
            "https://example.org/a",
            "Bell\u{0007} and\u{0001} tab\t",
            &Utc.timestamp_opt(1700000000, 0).unwrap(),
            "<p>O'Reilly\u{0007}\u{000B}</p>\n",
            None,
        );

        let xml = render_rss(&site(), &[item]).unwrap();
        assert!(!xml.contains('\u{0007}'));
        assert!(!xml.contains('\u{0001}'));
        assert!(!xml.contains('\u{000B}'));

        let parsed = parse_rss(&xml).unwrap();
        assert_eq!(parsed.items[0].title, "Bell and tab\t");
        assert_eq!(parsed.items[0].description, "<p>O'Reilly</p>\n");
    }

    #[test]
    fn test_channel_fields_escaped_and_read_back() {
        let xml = render_rss(&site(), &[]).unwrap();
        assert!(xml.contains("<title>Example &amp; Co</title>"));
        assert!(xml.contains("<image><url>https://example.org/logo.svg</url>"));

        let parsed = parse_rss(&xml).unwrap();
        assert_eq!(parsed.title, "Example & Co");
        assert_eq!(parsed.link, "https://example.org");
        assert_eq!(parsed.description, "News from <example>");
        assert_eq!(parsed.image_url, "https://example.org/logo.svg");
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let warsaw = FixedOffset::east_opt(3600).unwrap();
        let items = vec![
            Item::new(
                "https://example.org/b?x=1&y=2",
                "Quotes \"and\" 'apostrophes' & <tags>",
                &warsaw.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap(),
                "<img src=\"https://example.org/i.jpg\"><br><p>a ]]> b &amp; <b>c</b></p>",
                Some("https://example.org/i.jpg".to_string()),
            ),
            Item::new(
                "https://example.org/a",
                "Zażółć gęślą jaźń",
                &warsaw.with_ymd_and_hms(2024, 1, 4, 8, 0, 0).unwrap(),
                "",
                None,
            ),
        ];

        for xml in [
            render_rss(&site(), &items).unwrap(),
            render_rss_pretty(&site(), &items).unwrap(),
        ] {
            let parsed = parse_rss(&xml).unwrap();
            assert_eq!(parsed.items.len(), items.len());
            for (item, read) in items.iter().zip(&parsed.items) {
                assert_eq!(read.title, item.title);
                assert_eq!(read.link, item.url);
                assert_eq!(read.pub_date, item.published_at_rss);
                assert_eq!(read.description, item.body_html);
            }
        }
    }

    #[test]
    fn test_cdata_sections() {
        assert_eq!(cdata_sections("plain"), vec!["plain"]);
        assert_eq!(cdata_sections("a]]>b"), vec!["a]]", ">b"]);
        assert_eq!(cdata_sections("]]>]]>"), vec!["]]", ">]]", ">"]);
    }

    #[test]
    fn test_parse_rejects_truncated_document() {
        assert!(parse_rss("<rss><channel><title>x</title>").is_err());
    }
}

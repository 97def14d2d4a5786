//! Minimal Atom/RSS parsing for platforms that publish chapter feeds.
//!
//! Only the newest entry matters, so this walks the document with
//! `quick-xml` events instead of pulling in a full feed model. Atom feeds
//! use `<entry>` with `<published>`/`<updated>` and a `<link href>`
//! attribute; RSS uses `<item>` with `<pubDate>` and a text `<link>`.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use time::{OffsetDateTime, UtcOffset};

use crate::extract::parse_instant;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: Option<String>,
    pub published: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Title,
    Link,
    Published,
    Updated,
}

/// Parse the first (newest) entry of an Atom or RSS document.
///
/// Returns `Ok(None)` for a well-formed feed with no entries. `<updated>`
/// wins over `<published>` when both are present, matching how archives
/// report chapter edits.
pub fn first_entry(xml: &str) -> Result<Option<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_entry = false;
    let mut field = Field::None;
    let mut title = String::new();
    let mut link: Option<String> = None;
    let mut published: Option<String> = None;
    let mut updated: Option<String> = None;

    loop {
        match reader.read_event().context("malformed feed")? {
            Event::Start(e) => match e.name().as_ref() {
                b"entry" | b"item" => in_entry = true,
                b"title" if in_entry => field = Field::Title,
                b"link" if in_entry => field = Field::Link,
                b"published" | b"pubDate" if in_entry => field = Field::Published,
                b"updated" if in_entry => field = Field::Updated,
                _ => {}
            },

            // Atom links are self-closing with the target in `href`.
            Event::Empty(e) if in_entry && e.name().as_ref() == b"link" => {
                if link.is_none() {
                    link = e
                        .attributes()
                        .flatten()
                        .find(|attr| attr.key.as_ref() == b"href")
                        .and_then(|attr| attr.unescape_value().ok())
                        .map(|href| href.into_owned());
                }
            }

            Event::Text(e) if in_entry && field != Field::None => {
                let text = e.unescape().context("malformed feed text")?.into_owned();

                match field {
                    Field::Title if title.is_empty() => title = text,
                    Field::Link if link.is_none() => link = Some(text),
                    Field::Published if published.is_none() => published = Some(text),
                    Field::Updated if updated.is_none() => updated = Some(text),
                    _ => {}
                }
            }

            Event::CData(e) if in_entry && field == Field::Title && title.is_empty() => {
                title = String::from_utf8_lossy(&e.into_inner()).into_owned();
            }

            Event::End(e) => match e.name().as_ref() {
                // The first entry is all we need.
                b"entry" | b"item" => break,
                b"title" | b"link" | b"published" | b"pubDate" | b"updated" => {
                    field = Field::None;
                }
                _ => {}
            },

            Event::Eof => break,
            _ => {}
        }
    }

    if !in_entry {
        return Ok(None);
    }

    let published = updated
        .or(published)
        .and_then(|text| parse_instant(&text, UtcOffset::UTC));

    Ok(Some(FeedEntry {
        title,
        link,
        published,
    }))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
          <title>Chapters feed</title>
          <entry>
            <title>Chapter 19: Embers</title>
            <link rel="alternate" href="https://example.org/works/1/chapters/19"/>
            <published>2025-08-04T10:00:00Z</published>
            <updated>2025-08-04T12:30:00Z</updated>
          </entry>
          <entry>
            <title>Chapter 18</title>
            <published>2025-07-28T10:00:00Z</published>
          </entry>
        </feed>"#;

    const RSS: &str = r#"<?xml version="1.0"?>
        <rss version="2.0">
          <channel>
            <title>Chapters</title>
            <item>
              <title><![CDATA[Chapter 12: Homecoming]]></title>
              <link>https://example.org/chapters/12</link>
              <pubDate>Mon, 04 Aug 2025 12:30:00 +0000</pubDate>
            </item>
          </channel>
        </rss>"#;

    #[test]
    fn parses_first_atom_entry() {
        let entry = first_entry(ATOM).unwrap().unwrap();

        assert_eq!(entry.title, "Chapter 19: Embers");
        assert_eq!(
            entry.link.as_deref(),
            Some("https://example.org/works/1/chapters/19")
        );
        // `updated` wins over `published`.
        assert_eq!(entry.published, Some(datetime!(2025-08-04 12:30 UTC)));
    }

    #[test]
    fn parses_first_rss_item() {
        let entry = first_entry(RSS).unwrap().unwrap();

        assert_eq!(entry.title, "Chapter 12: Homecoming");
        assert_eq!(entry.link.as_deref(), Some("https://example.org/chapters/12"));
        assert_eq!(entry.published, Some(datetime!(2025-08-04 12:30 UTC)));
    }

    #[test]
    fn empty_feed_yields_none() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        assert_eq!(first_entry(xml).unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(first_entry("<feed><entry></feed>").is_err());
    }
}

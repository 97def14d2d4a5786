//! Per-platform scrapers.
//!
//! Each platform gets one adapter implementing [`Scraper`]. Adapters walk a
//! prioritized selector cascade over the platform's chapter/episode listing
//! and return a normalized [`PlatformRecord`]; whether the newest entry sits
//! first or last in the listing is a fixed property of each site, not
//! something detected at runtime. Dispatch is table-driven through
//! [`registry`]. Network and parse failures come back as `Err` and are
//! degraded to `error`-status records by the aggregator, never panics.

pub mod ao3;
pub mod inkspired;
pub mod kofi;
pub mod royalroad;
pub mod scribblehub;
pub mod tapas;
pub mod wattpad;

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use futures::future::BoxFuture;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use time::OffsetDateTime;

use crate::config::PlatformConfig;
use crate::extract::{
    self, chapter_number, clean_title, element_text, format_relative_time, Locator,
};
use crate::record::{PlatformRecord, PlatformStatus};

pub trait Scraper: Send + Sync {
    /// Fetch the platform and produce a record for its newest chapter.
    fn scrape<'a>(
        &'a self,
        client: &'a Client,
        platform: &'a PlatformConfig,
    ) -> BoxFuture<'a, Result<PlatformRecord>>;
}

pub type Registry = HashMap<&'static str, Box<dyn Scraper>>;

/// All known adapters, keyed by platform id.
pub fn registry() -> Registry {
    let mut scrapers: Registry = HashMap::new();

    scrapers.insert("royalroad", Box::new(royalroad::RoyalRoad));
    scrapers.insert("wattpad", Box::new(wattpad::Wattpad));
    scrapers.insert("tapas", Box::new(tapas::Tapas));
    scrapers.insert("ao3", Box::new(ao3::ArchiveOfOurOwn));
    scrapers.insert("inkspired", Box::new(inkspired::Inkspired));
    scrapers.insert("scribblehub", Box::new(scribblehub::ScribbleHub));
    scrapers.insert("kofi", Box::new(kofi::KoFi));

    scrapers
}

pub(crate) async fn fetch_text(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(Into::into)
        .and_then(|r| r.error_for_status().context("server returned an error"))
        .with_context(|| anyhow!("could not fetch `{url}`"))?;

    response
        .text()
        .await
        .with_context(|| anyhow!("could not read the response when fetching `{url}`"))
}

/// Whether a site lists its newest chapter first or last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListOrder {
    NewestFirst,
    OldestFirst,
}

pub(crate) struct ListingItem<'a> {
    pub element: ElementRef<'a>,
    pub total: usize,
}

/// Walk a selector cascade and return the latest item of the first selector
/// that matches anything. Selector order encodes preference.
pub(crate) fn latest_item<'a>(
    doc: &'a Html,
    cascade: &[Locator],
    order: ListOrder,
) -> Option<ListingItem<'a>> {
    for locator in cascade {
        let items = locator.select(doc);

        if items.is_empty() {
            continue;
        }

        let total = items.len();
        let element = match order {
            ListOrder::NewestFirst => items.into_iter().next()?,
            ListOrder::OldestFirst => items.into_iter().next_back()?,
        };

        return Some(ListingItem { element, total });
    }

    None
}

/// First descendant link matching any of `filters` (tried in order), falling
/// back to the first `<a>` at all.
pub(crate) fn item_link<'a>(
    item: ElementRef<'a>,
    filters: &[&'static str],
) -> Option<ElementRef<'a>> {
    // Some cascades select the anchors themselves.
    if item.value().name() == "a" {
        return Some(item);
    }

    for css in filters.iter().chain(["a"].iter()) {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };

        if let Some(link) = item.select(&selector).next() {
            return Some(link);
        }
    }

    None
}

/// Publish time of a listing item, from `<time>`-style descendants: the
/// `datetime`/`unixtime` attributes are preferred, then relative-time text
/// such as "2 days ago" (also accepted from a `title` attribute).
pub(crate) fn item_time(item: ElementRef<'_>, now: OffsetDateTime) -> Option<OffsetDateTime> {
    let selector = Selector::parse("time, .date, .published, .timestamp, [datetime]").ok()?;

    for el in item.select(&selector) {
        if let Some(ts) = el
            .value()
            .attr("datetime")
            .and_then(|v| extract::parse_instant(v, now.offset()))
        {
            return Some(ts);
        }

        if let Some(ts) = el
            .value()
            .attr("unixtime")
            .and_then(extract::parse_unix_timestamp)
        {
            return Some(ts);
        }

        if let Some(ts) = el
            .value()
            .attr("title")
            .and_then(|v| extract::parse_relative_time(now, v))
        {
            return Some(ts);
        }

        let text = element_text(&el);
        if text.len() < 50 {
            if let Some(ts) = extract::parse_relative_time(now, &text) {
                return Some(ts);
            }
        }
    }

    None
}

/// Resolve a possibly-relative href against the platform page URL.
pub(crate) fn resolve_href(base: &Url, href: &str) -> String {
    base.join(href)
        .map(String::from)
        .unwrap_or_else(|_| base.to_string())
}

/// What an adapter managed to pull out of one platform page or feed.
pub(crate) struct ScrapedChapter {
    pub title: String,
    pub chapter_url: String,
    pub timestamp: Option<OffsetDateTime>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub total_chapters: Option<usize>,
}

impl ScrapedChapter {
    pub(crate) fn into_record(self, platform: &PlatformConfig, now: OffsetDateTime) -> PlatformRecord {
        let last_update = match self.timestamp {
            Some(ts) => format_relative_time(now, ts),
            None => "recently".into(),
        };

        PlatformRecord {
            platform: platform.id.clone(),
            status: PlatformStatus::Updated,
            last_chapter: chapter_number(&self.title),
            chapter_title: self.title,
            last_update,
            timestamp: self.timestamp,
            views: self.views.unwrap_or(0),
            likes: self.likes.unwrap_or(0),
            comments: self.comments.unwrap_or(0),
            chapter_url: self.chapter_url,
            platform_url: platform.url.to_string(),
            note: None,
            error: None,
            tracking_method: None,
            days_behind: None,
            total_chapters: self.total_chapters,
        }
    }
}

/// Shared scrape path for the chapter-table platforms: find the latest item
/// of the cascade, pull a link out of it and build a partial record.
pub(crate) fn scrape_listing(
    doc: &Html,
    platform: &PlatformConfig,
    now: OffsetDateTime,
    cascade: &[Locator],
    order: ListOrder,
    link_filters: &[&'static str],
    what: &str,
) -> Result<ScrapedChapter> {
    let Some(item) = latest_item(doc, cascade, order) else {
        bail!("could not find the {what} listing with any known selector");
    };

    let Some(link) = item_link(item.element, link_filters) else {
        bail!("could not extract a {what} link from the latest listing item");
    };

    let title = clean_title(&element_text(&link));
    let chapter_url = match link.value().attr("href") {
        Some(href) => resolve_href(&platform.url, href),
        None => platform.url.to_string(),
    };

    Ok(ScrapedChapter {
        title,
        chapter_url,
        timestamp: item_time(item.element, now),
        views: None,
        likes: None,
        comments: None,
        total_chapters: Some(item.total),
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn latest_item_respects_order() {
        let doc = doc("<ul><li>one</li><li>two</li><li>three</li></ul>");
        let cascade = [Locator::css(".missing"), Locator::css("li")];

        let first = latest_item(&doc, &cascade, ListOrder::NewestFirst).unwrap();
        assert_eq!(element_text(&first.element), "one");
        assert_eq!(first.total, 3);

        let last = latest_item(&doc, &cascade, ListOrder::OldestFirst).unwrap();
        assert_eq!(element_text(&last.element), "three");
    }

    #[test]
    fn item_link_prefers_filters() {
        let doc = doc(
            r#"<div id="row">
                <a href="/profile">author</a>
                <a href="/fiction/1/chapter/5">Chapter 5</a>
            </div>"#,
        );
        let row = doc
            .select(&Selector::parse("#row").unwrap())
            .next()
            .unwrap();

        let link = item_link(row, &[r#"a[href*="chapter"]"#]).unwrap();
        assert_eq!(element_text(&link), "Chapter 5");

        // Without a filter the first anchor wins.
        let link = item_link(row, &[]).unwrap();
        assert_eq!(element_text(&link), "author");
    }

    #[test]
    fn item_time_reads_datetime_attributes() {
        let now = datetime!(2025-08-10 12:00 UTC);
        let doc = doc(r#"<tr id="row"><time datetime="2025-08-08T09:00:00Z">2 days ago</time></tr>"#);
        let row = doc.select(&Selector::parse("#row").unwrap()).next();

        // html5ever moves stray <tr> content around, so fall back to the root.
        let scope = row.unwrap_or_else(|| doc.root_element());
        assert_eq!(item_time(scope, now), Some(datetime!(2025-08-08 09:00 UTC)));
    }

    #[test]
    fn item_time_parses_relative_text() {
        let now = datetime!(2025-08-10 12:00 UTC);
        let doc = doc(r#"<div id="row"><span class="date">3 days ago</span></div>"#);
        let row = doc.select(&Selector::parse("#row").unwrap()).next().unwrap();

        assert_eq!(item_time(row, now), Some(now - time::Duration::days(3)));
    }

    #[test]
    fn resolve_href_handles_relative_and_absolute() {
        let base = Url::parse("https://www.royalroad.com/fiction/110754/unyielding").unwrap();

        assert_eq!(
            resolve_href(&base, "/fiction/110754/unyielding/chapter/1"),
            "https://www.royalroad.com/fiction/110754/unyielding/chapter/1"
        );
        assert_eq!(
            resolve_href(&base, "https://elsewhere.example/ch/2"),
            "https://elsewhere.example/ch/2"
        );
    }
}

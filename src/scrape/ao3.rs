//! Archive of Our Own scraper.
//!
//! AO3 publishes a chapters feed (Atom, despite the `.atom`-less links some
//! themes use), which is the preferred source. When the feed is missing or
//! empty the adapter falls back to scraping the work page's chapter index,
//! newest chapter last. Work-level stats sit in `dd` elements with stable
//! classes (`hits`, `kudos`, `comments`).

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use scraper::Html;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::PlatformConfig;
use crate::extract::{clean_title, engagement_metric, parse_instant, Locator};
use crate::feedparse;
use crate::record::PlatformRecord;

use super::{fetch_text, resolve_href, scrape_listing, ListOrder, ScrapedChapter, Scraper};

const CHAPTER_CASCADE: &[Locator] = &[
    Locator::css("#chapter_index li a"),
    Locator::css("ol.chapter.index.group li a"),
    Locator::css("ol.index.group li a"),
    Locator::css(".chapter .title a"),
    Locator::css(".work .chapter a"),
];

const HITS: &[Locator] = &[Locator::css("dd.hits"), Locator::containing("dd", "Hits")];
const KUDOS: &[Locator] = &[Locator::css("dd.kudos"), Locator::containing("dd", "Kudos")];
const COMMENTS: &[Locator] = &[
    Locator::css("dd.comments"),
    Locator::containing("dd", "Comments"),
];

/// Updated/published date in the work metadata block.
const WORK_DATE: &[Locator] = &[Locator::css("dd.status"), Locator::css("dd.published")];

pub struct ArchiveOfOurOwn;

impl Scraper for ArchiveOfOurOwn {
    fn scrape<'a>(
        &'a self,
        client: &'a Client,
        platform: &'a PlatformConfig,
    ) -> BoxFuture<'a, Result<PlatformRecord>> {
        Box::pin(async move {
            let now = OffsetDateTime::now_utc();

            if let Some(feed_url) = &platform.feed_url {
                let xml = fetch_text(client, feed_url).await?;

                if let Some(record) = parse_feed(&xml, platform, now)? {
                    return Ok(record);
                }

                debug!("The chapters feed is empty; falling back to the work page");
            }

            let html = fetch_text(client, &platform.url).await?;
            parse_work_page(&html, platform, now)
        })
    }
}

fn parse_feed(
    xml: &str,
    platform: &PlatformConfig,
    now: OffsetDateTime,
) -> Result<Option<PlatformRecord>> {
    let Some(entry) = feedparse::first_entry(xml)? else {
        return Ok(None);
    };

    if entry.title.is_empty() {
        return Ok(None);
    }

    let chapter_url = match &entry.link {
        Some(link) => resolve_href(&platform.url, link),
        None => platform.url.to_string(),
    };

    let scraped = ScrapedChapter {
        title: clean_title(&entry.title),
        chapter_url,
        timestamp: entry.published,
        // The feed carries no engagement stats.
        views: None,
        likes: None,
        comments: None,
        total_chapters: None,
    };

    Ok(Some(scraped.into_record(platform, now)))
}

fn parse_work_page(
    html: &str,
    platform: &PlatformConfig,
    now: OffsetDateTime,
) -> Result<PlatformRecord> {
    let doc = Html::parse_document(html);

    let mut chapter = scrape_listing(
        &doc,
        platform,
        now,
        CHAPTER_CASCADE,
        ListOrder::OldestFirst,
        &[],
        "chapter",
    )?;

    if chapter.timestamp.is_none() {
        chapter.timestamp = WORK_DATE
            .iter()
            .flat_map(|locator| locator.select(&doc))
            .find_map(|el| parse_instant(&crate::extract::element_text(&el), now.offset()));
    }

    chapter.views = engagement_metric(&doc, HITS);
    chapter.likes = engagement_metric(&doc, KUDOS);
    chapter.comments = engagement_metric(&doc, COMMENTS);

    Ok(chapter.into_record(platform, now))
}

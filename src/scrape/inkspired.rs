//! Inkspired story-page scraper. Chapter lists are reverse-chronological.

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use scraper::Html;
use time::OffsetDateTime;

use crate::config::PlatformConfig;
use crate::extract::Locator;
use crate::record::PlatformRecord;

use super::{fetch_text, scrape_listing, ListOrder, Scraper};

const CHAPTER_CASCADE: &[Locator] = &[
    Locator::css(".chapter-list .chapter"),
    Locator::css(".story-chapters .chapter"),
    Locator::css(".chapters .chapter-item"),
    Locator::css(".episode-list .episode"),
    Locator::css(".content-list .content-item"),
];

pub struct Inkspired;

impl Scraper for Inkspired {
    fn scrape<'a>(
        &'a self,
        client: &'a Client,
        platform: &'a PlatformConfig,
    ) -> BoxFuture<'a, Result<PlatformRecord>> {
        Box::pin(async move {
            let html = fetch_text(client, &platform.url).await?;
            parse_story_page(&html, platform, OffsetDateTime::now_utc())
        })
    }
}

fn parse_story_page(
    html: &str,
    platform: &PlatformConfig,
    now: OffsetDateTime,
) -> Result<PlatformRecord> {
    let doc = Html::parse_document(html);

    let chapter = scrape_listing(
        &doc,
        platform,
        now,
        CHAPTER_CASCADE,
        ListOrder::NewestFirst,
        &[],
        "chapter",
    )?;

    Ok(chapter.into_record(platform, now))
}

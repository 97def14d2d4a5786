//! ScribbleHub series-page scraper. The table of contents keeps chapters in
//! chronological order, newest last.

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
    Locator::css("li.toc_w"),
    Locator::css(".toc_ol li"),
    Locator::css(".chapter_row_table tr"),
    Locator::css(".toc-table tr"),
    Locator::css(".chapter-table tr"),
    Locator::css("table tr"),
];

pub struct ScribbleHub;

impl Scraper for ScribbleHub {
    fn scrape<'a>(
        &'a self,
        client: &'a Client,
        platform: &'a PlatformConfig,
    ) -> BoxFuture<'a, Result<PlatformRecord>> {
        Box::pin(async move {
            let html = fetch_text(client, &platform.url).await?;
            parse_series_page(&html, platform, OffsetDateTime::now_utc())
        })
    }
}

fn parse_series_page(
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
        ListOrder::OldestFirst,
        &[r#"a[href*="chapter"]"#, r#"a[href*="read"]"#],
        "chapter",
    )?;

    Ok(chapter.into_record(platform, now))
}

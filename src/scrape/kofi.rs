//! Ko-fi profile scraper. This tracks blog/update posts rather than
//! chapters, so the chapter label is fixed and only the post title, URL and
//! publish time vary.

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use scraper::Html;
use time::OffsetDateTime;

use crate::config::PlatformConfig;
use crate::extract::{clean_title, element_text, Locator};
use crate::record::PlatformRecord;

use super::{fetch_text, scrape_listing, ListOrder, Scraper};

const POST_CASCADE: &[Locator] = &[
    Locator::css(".feedpost-container"),
    Locator::css(".post-container"),
    Locator::css(".kfds-layout-item"),
    Locator::css(".feed-item"),
    Locator::css("article"),
    Locator::css(".post"),
];

const TITLE_FALLBACK: &[Locator] = &[
    Locator::css("h1"),
    Locator::css("h2"),
    Locator::css("h3"),
    Locator::css(".title"),
];

pub struct KoFi;

impl Scraper for KoFi {
    fn scrape<'a>(
        &'a self,
        client: &'a Client,
        platform: &'a PlatformConfig,
    ) -> BoxFuture<'a, Result<PlatformRecord>> {
        Box::pin(async move {
            let html = fetch_text(client, &platform.url).await?;
            parse_profile_page(&html, platform, OffsetDateTime::now_utc())
        })
    }
}

fn parse_profile_page(
    html: &str,
    platform: &PlatformConfig,
    now: OffsetDateTime,
) -> Result<PlatformRecord> {
    let doc = Html::parse_document(html);

    let mut post = scrape_listing(
        &doc,
        platform,
        now,
        POST_CASCADE,
        ListOrder::NewestFirst,
        &[],
        "post",
    )?;

    if post.title.is_empty() {
        if let Some(item) = super::latest_item(&doc, POST_CASCADE, ListOrder::NewestFirst) {
            post.title = TITLE_FALLBACK
                .iter()
                .flat_map(|locator| locator.select_within(item.element))
                .map(|el| clean_title(&element_text(&el)))
                .find(|title| !title.is_empty())
                .unwrap_or_else(|| "Latest Ko-fi Post".into());
        }
    }

    let mut record = post.into_record(platform, now);
    record.last_chapter = "Latest Post".into();

    Ok(record)
}

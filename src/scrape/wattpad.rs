//! Wattpad story-page scraper.
//!
//! The table of contents lists parts chronologically, newest last. Reads and
//! votes come from the story-level stat badges, which often use `1.2K`-style
//! abbreviations.

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use scraper::Html;
use time::OffsetDateTime;

use crate::config::PlatformConfig;
use crate::extract::{engagement_metric, Locator};
use crate::record::PlatformRecord;

use super::{fetch_text, scrape_listing, ListOrder, Scraper};

const PART_CASCADE: &[Locator] = &[
    Locator::css("ul.table-of-contents li"),
    Locator::css(".table-of-contents li"),
    Locator::css(".story-parts li"),
    Locator::css(r#"ul[data-component="table-of-contents"] li"#),
    Locator::css(".table-of-contents .story-part"),
    Locator::css(".toc-list li"),
    Locator::css(r#".table-of-contents a[href*="part"]"#),
];

const READS: &[Locator] = &[
    Locator::css(".reads"),
    Locator::css(".read-count"),
    Locator::css(".story-stats .reads"),
    Locator::containing(".stats-item", "Reads"),
];

const VOTES: &[Locator] = &[
    Locator::css(".votes"),
    Locator::css(".vote-count"),
    Locator::css(".story-stats .votes"),
    Locator::containing(".stats-item", "Votes"),
];

const COMMENTS: &[Locator] = &[
    Locator::css(".comments"),
    Locator::css(".comment-count"),
    Locator::css(".story-stats .comments"),
    Locator::containing(".stats-item", "Comments"),
];

pub struct Wattpad;

impl Scraper for Wattpad {
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

    let mut part = scrape_listing(
        &doc,
        platform,
        now,
        PART_CASCADE,
        ListOrder::OldestFirst,
        &[],
        "part",
    )?;

    part.views = engagement_metric(&doc, READS);
    part.likes = engagement_metric(&doc, VOTES);
    part.comments = engagement_metric(&doc, COMMENTS);

    Ok(part.into_record(platform, now))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn platform() -> PlatformConfig {
        crate::config::Config::default()
            .platforms
            .into_iter()
            .find(|p| p.id == "wattpad")
            .unwrap()
    }

    const STORY_PAGE: &str = r#"
        <html><body>
          <div class="story-stats">
            <span class="reads">1.2M</span>
            <span class="votes">45.1K</span>
            <span class="comments">2,301</span>
          </div>
          <ul class="table-of-contents">
            <li><a href="/1389-part-one">Part 1 - Awakening</a></li>
            <li>
              <a href="/1422-part-eighteen-two">18.2 - Aftermath</a>
              <span class="date">yesterday</span>
            </li>
          </ul>
        </body></html>"#;

    #[test]
    fn parses_last_part_and_abbreviated_stats() {
        let now = datetime!(2025-08-10 12:00 UTC);
        let record = parse_story_page(STORY_PAGE, &platform(), now).unwrap();

        assert_eq!(record.last_chapter, "18.2");
        assert_eq!(record.chapter_title, "18.2 - Aftermath");
        assert_eq!(
            record.chapter_url,
            "https://www.wattpad.com/1422-part-eighteen-two"
        );
        assert_eq!(record.views, 1_200_000);
        assert_eq!(record.likes, 45_100);
        assert_eq!(record.comments, 2301);
        assert_eq!(record.timestamp, Some(now - time::Duration::days(1)));
    }

    #[test]
    fn missing_toc_is_an_error() {
        let now = datetime!(2025-08-10 12:00 UTC);
        assert!(parse_story_page("<html></html>", &platform(), now).is_err());
    }
}

//! Royal Road fiction-page scraper.
//!
//! Chapters live in a table sorted oldest-first, so the newest chapter is the
//! last row. The fiction sidebar carries overall stats (views, favorites) in
//! a definition list without stable classes, hence the text-matched locators.

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use scraper::Html;
use time::OffsetDateTime;

use crate::config::PlatformConfig;
use crate::extract::{engagement_metric, Locator};
use crate::record::PlatformRecord;

use super::{fetch_text, scrape_listing, ListOrder, Scraper};

const CHAPTER_CASCADE: &[Locator] = &[
    Locator::css("tbody .chapter-row"),
    Locator::css(".chapter-row"),
    Locator::css("#chapters tbody tr"),
    Locator::css(".portlet-body table tr"),
    Locator::css("table tr"),
];

const VIEWS: &[Locator] = &[
    Locator::containing(".fiction-stats li", "Views"),
    Locator::containing("dd", "Views"),
    Locator::css(".view-count"),
    Locator::css(".stats-content"),
];

const FAVORITES: &[Locator] = &[
    Locator::containing(".fiction-stats li", "Favorites"),
    Locator::containing("dd", "Favorites"),
    Locator::css(".favorites"),
];

pub struct RoyalRoad;

impl Scraper for RoyalRoad {
    fn scrape<'a>(
        &'a self,
        client: &'a Client,
        platform: &'a PlatformConfig,
    ) -> BoxFuture<'a, Result<PlatformRecord>> {
        Box::pin(async move {
            let html = fetch_text(client, &platform.url).await?;
            parse_fiction_page(&html, platform, OffsetDateTime::now_utc())
        })
    }
}

fn parse_fiction_page(
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
        &[r#"a[href*="chapter"]"#],
        "chapter",
    )?;

    chapter.views = engagement_metric(&doc, VIEWS);
    // Favorites stand in for likes; chapter-level comment counts would need
    // a second request per chapter.
    chapter.likes = engagement_metric(&doc, FAVORITES);

    Ok(chapter.into_record(platform, now))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::record::PlatformStatus;

    use super::*;

    fn platform() -> PlatformConfig {
        crate::config::Config::default()
            .platforms
            .into_iter()
            .find(|p| p.id == "royalroad")
            .unwrap()
    }

    const FICTION_PAGE: &str = r#"
        <html><body>
          <div class="fiction-stats">
            <ul><li>Total Views : 12,345</li><li>Favorites : 1.2K</li></ul>
          </div>
          <table id="chapters"><tbody>
            <tr class="chapter-row">
              <td><a href="/fiction/110754/unyielding/chapter/100/1-beginnings">Chapter 1: Beginnings</a></td>
              <td><time datetime="2025-07-07T10:00:00Z"></time></td>
            </tr>
            <tr class="chapter-row">
              <td><a href="/fiction/110754/unyielding/chapter/200/18-the-fall">Chapter 18: The Fall  2 days ago</a></td>
              <td><time datetime="2025-08-08T09:30:00Z"></time></td>
            </tr>
          </tbody></table>
        </body></html>"#;

    #[test]
    fn parses_newest_chapter_from_table() {
        let now = datetime!(2025-08-10 12:00 UTC);
        let record = parse_fiction_page(FICTION_PAGE, &platform(), now).unwrap();

        assert_eq!(record.status, PlatformStatus::Updated);
        assert_eq!(record.last_chapter, "18");
        assert_eq!(record.chapter_title, "Chapter 18: The Fall");
        assert_eq!(
            record.chapter_url,
            "https://www.royalroad.com/fiction/110754/unyielding/chapter/200/18-the-fall"
        );
        assert_eq!(record.timestamp, Some(datetime!(2025-08-08 09:30 UTC)));
        assert_eq!(record.views, 12_345);
        assert_eq!(record.likes, 1200);
        assert_eq!(record.total_chapters, Some(2));
        assert!(record.error.is_none());
    }

    #[test]
    fn selector_miss_is_a_descriptive_error() {
        let now = datetime!(2025-08-10 12:00 UTC);
        let err = parse_fiction_page("<html><body><p>maintenance</p></body></html>", &platform(), now)
            .unwrap_err();

        assert!(err.to_string().contains("chapter listing"));
    }
}
